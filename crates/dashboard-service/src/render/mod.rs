//! HTML rendering of a snapshot.
//!
//! Rendering is a pure function of a [`Snapshot`], the static
//! [`DashboardView`] settings and the current time. Every string that comes
//! from the monitored server goes through [`escape_html`].

use crate::models::{Confidence, PresenceKind, Snapshot};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::{self, Write};
use std::time::Duration;

const CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

/// Static page settings.
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// Page title.
    pub title: String,

    /// `host:port` of the monitored server.
    pub address: String,

    /// Poll interval, also used as the page reload interval.
    pub refresh_interval: Duration,

    /// Zone used for displayed timestamps.
    pub tz: Tz,
}

impl DashboardView {
    /// Whole seconds between page reloads, never zero.
    pub fn refresh_seconds(&self) -> u64 {
        self.refresh_interval.as_secs().max(1)
    }
}

/// Format a duration as `1d 2h 3m 4s`, omitting zero day/hour/minute parts.
pub fn fmt_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}

/// Format a timestamp in the display zone, e.g. `Oct 18, 03:04:05 PM`.
pub fn fmt_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%b %d, %I:%M:%S %p").to_string()
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render the full dashboard page.
pub fn render_dashboard(
    snapshot: &Snapshot,
    view: &DashboardView,
    now: DateTime<Utc>,
) -> Result<String, fmt::Error> {
    let mut out = String::with_capacity(8 * 1024);
    write_head(&mut out, view)?;
    write_body(&mut out, snapshot, view, now)?;
    write_scripts(&mut out, snapshot, view)?;
    out.push_str("</body>\n</html>\n");
    Ok(out)
}

fn write_head(out: &mut String, view: &DashboardView) -> fmt::Result {
    let title = escape_html(&view.title);
    write!(
        out,
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width,initial-scale=1" />
<title>{title}</title>
<link rel="preconnect" href="https://cdn.jsdelivr.net" crossorigin>
<script src="{CHART_JS_URL}"></script>
<style>
  :root{{--bg:#0b0b0f;--glass:rgba(255,255,255,0.06);--txt:#e7e7ef;--muted:#a7a7bf;--ok:#22c55e;--bad:#ef4444;--warn:#f59e0b}}
  *{{box-sizing:border-box}}
  body{{margin:0;background:radial-gradient(1200px 800px at 10% -20%,#1b1530 0%,transparent 60%),radial-gradient(1200px 800px at 110% 120%,#13263a 0%,transparent 60%),var(--bg);color:var(--txt);font:16px/1.5 Inter,system-ui,-apple-system,Segoe UI,Roboto,sans-serif}}
  .wrap{{max-width:1100px;margin:48px auto;padding:0 20px}}
  .topbar{{display:flex;flex-wrap:wrap;gap:14px;align-items:center;justify-content:space-between;margin-bottom:24px}}
  h1{{margin:0;font-weight:800;letter-spacing:.2px}}
  .pill{{display:inline-flex;align-items:center;gap:8px;padding:6px 12px;border-radius:999px;background:var(--glass);border:1px solid rgba(255,255,255,.08)}}
  .pill.ok{{background:rgba(34,197,94,.18);border-color:rgba(34,197,94,.35)}}
  .pill.bad{{background:rgba(239,68,68,.18);border-color:rgba(239,68,68,.35)}}
  .pill.warn{{background:rgba(245,158,11,.18);border-color:rgba(245,158,11,.35)}}
  .grid{{display:grid;gap:16px;grid-template-columns:repeat(12,1fr)}}
  .card{{grid-column:span 12;background:linear-gradient(to bottom right,rgba(255,255,255,.06),rgba(255,255,255,.03));border:1px solid rgba(255,255,255,.08);border-radius:18px;padding:18px 18px 14px}}
  .card h3{{margin:0 0 12px 0;font-weight:700;color:#fff}}
  .kpi{{font-size:28px;font-weight:800}}
  .muted{{color:var(--muted);font-size:13px}}
  @media(min-width:800px){{.span-4{{grid-column:span 4}}.span-8{{grid-column:span 8}}}}
  .row{{display:flex;flex-wrap:wrap;gap:10px;align-items:center}}
  .tag{{padding:4px 10px;border:1px solid rgba(255,255,255,.12);border-radius:10px;background:rgba(255,255,255,.04)}}
  .names{{display:flex;flex-wrap:wrap;gap:8px}}
  .countdown{{font-variant-numeric:tabular-nums}}
  .footer{{margin-top:18px;color:var(--muted);font-size:12px;text-align:center}}
  canvas{{max-height:280px}}
  .event{{display:flex;justify-content:space-between;padding:8px 0;border-bottom:1px dashed rgba(255,255,255,.08)}}
  .event:last-child{{border-bottom:0}}
  .evt-tag{{font-weight:700}}
  .evt-join{{color:var(--ok)}}
  .evt-leave{{color:var(--bad)}}
</style>
</head>
"#
    )
}

fn write_body(
    out: &mut String,
    snapshot: &Snapshot,
    view: &DashboardView,
    now: DateTime<Utc>,
) -> fmt::Result {
    let tz_name = view.tz.name();
    let refresh = view.refresh_seconds();

    let badge = match (snapshot.online, snapshot.confidence) {
        (true, Some(Confidence::BestEffort)) => {
            r#"<span class="pill warn">Online (best effort)</span>"#
        }
        (true, _) => r#"<span class="pill ok">Online</span>"#,
        (false, _) => r#"<span class="pill bad">Offline</span>"#,
    };

    write!(
        out,
        r#"<body>
<div class="wrap">
  <div class="topbar">
    <div>
      <h1>{title}</h1>
      <div class="muted">Querying <b>{address}</b></div>
    </div>
    <div class="row">
      {badge}
      <span class="pill">Refresh in <span id="cd" class="countdown">{refresh}</span>s</span>
    </div>
  </div>
  <div class="grid">
"#,
        title = escape_html(&view.title),
        address = escape_html(&view.address),
    )?;

    // Status card
    let status = if snapshot.online {
        "Online ✅"
    } else {
        "Offline ❌"
    };
    write!(
        out,
        r#"    <div class="card span-4">
      <h3>Status</h3>
      <div class="kpi">{status}</div>
      <div class="muted">Last check: {checked} ({tz_name})</div>
"#,
        checked = fmt_time(snapshot.last_poll_at, view.tz),
    )?;
    if snapshot.confidence == Some(Confidence::BestEffort) {
        out.push_str(
            "      <div class=\"muted\">Reported by a public status API; the server did not answer directly</div>\n",
        );
    }
    if let Some(version) = &snapshot.server.version {
        writeln!(
            out,
            "      <div class=\"muted\">Version: {}</div>",
            escape_html(version)
        )?;
    }
    if !snapshot.online {
        if let Some(error) = &snapshot.last_error {
            writeln!(
                out,
                "      <div class=\"muted\">Last error: {}</div>",
                escape_html(error)
            )?;
        }
    }
    out.push_str("    </div>\n");

    // Uptime card
    let (uptime, since) = match snapshot.online_since {
        Some(since) if snapshot.online => (
            fmt_duration(snapshot.uptime_at(now)),
            format!("Since last online: {}", fmt_time(since, view.tz)),
        ),
        _ => ("—".to_string(), "—".to_string()),
    };
    write!(
        out,
        r#"    <div class="card span-4">
      <h3>Uptime</h3>
      <div class="kpi">{uptime}</div>
      <div class="muted">{since}</div>
    </div>
"#
    )?;

    // Players card
    let player_count = match (snapshot.server.players_online, snapshot.server.players_max) {
        (Some(online), Some(max)) => format!("{online} / {max}"),
        _ => snapshot.participants.len().to_string(),
    };
    write!(
        out,
        r#"    <div class="card span-4">
      <h3>Players Online</h3>
      <div class="kpi">{player_count}</div>
      <div class="names">
"#
    )?;
    if snapshot.participants.is_empty() {
        out.push_str("        <span class=\"muted\">None</span>\n");
    } else {
        for name in &snapshot.participants {
            writeln!(out, "        <span class=\"tag\">{}</span>", escape_html(name))?;
        }
    }
    out.push_str("      </div>\n    </div>\n");

    // Latency card
    write!(
        out,
        r#"    <div class="card span-8">
      <h3>Latency (ms) – last {count} checks</h3>
      <canvas id="latChart"></canvas>
    </div>
"#,
        count = snapshot.latency_history.len(),
    )?;

    // Events card, newest first
    out.push_str("    <div class=\"card span-4\">\n      <h3>Join / Leave (recent)</h3>\n");
    if snapshot.recent_events.is_empty() {
        out.push_str("      <div class=\"muted\">No recent activity</div>\n");
    }
    for event in snapshot.recent_events.iter().rev() {
        let class = match event.kind {
            PresenceKind::Join => "evt-join",
            PresenceKind::Leave => "evt-leave",
        };
        write!(
            out,
            r#"      <div class="event">
        <div><span class="evt-tag {class}">{kind}</span> {name}</div>
        <div class="muted">{at}</div>
      </div>
"#,
            kind = event.kind.as_str().to_uppercase(),
            name = escape_html(&event.name),
            at = fmt_time(event.at, view.tz),
        )?;
    }
    out.push_str("    </div>\n  </div>\n");

    write!(
        out,
        r#"  <div class="footer">Auto refreshes every {refresh}s • Server time zone: {tz_name}</div>
</div>
"#
    )
}

fn write_scripts(out: &mut String, snapshot: &Snapshot, view: &DashboardView) -> fmt::Result {
    // Only numbers go into the script block
    let labels: Vec<i64> = snapshot
        .latency_history
        .iter()
        .map(|s| s.at.timestamp_millis())
        .collect();
    let values: Vec<Option<u64>> = snapshot.latency_history.iter().map(|s| s.millis).collect();
    let labels = serde_json::to_string(&labels).map_err(|_| fmt::Error)?;
    let values = serde_json::to_string(&values).map_err(|_| fmt::Error)?;
    let refresh = view.refresh_seconds();

    write!(
        out,
        r#"<script>
  (function(){{
    const el = document.getElementById('cd');
    let left = {refresh};
    setInterval(()=>{{
      left = Math.max(0, left - 1);
      el.textContent = left;
      if(left === 0) location.reload();
    }}, 1000);
  }})();

  (function(){{
    if (typeof Chart === 'undefined') return;
    Chart.defaults.color = '#e7e7ef';
    const labels = {labels};
    const values = {values};
    const ctx = document.getElementById('latChart').getContext('2d');
    const fmt = (ts) => new Date(ts).toLocaleTimeString([], {{hour:'2-digit', minute:'2-digit', second:'2-digit'}});
    new Chart(ctx, {{
      type: 'line',
      data: {{
        labels: labels.map(fmt),
        datasets: [{{ label: 'ms', data: values, tension: .3, borderWidth: 2, pointRadius: 2, spanGaps: true }}]
      }},
      options: {{
        plugins: {{ legend: {{ display: false }} }},
        scales: {{
          x: {{ grid: {{ color: 'rgba(255,255,255,.08)' }} }},
          y: {{ beginAtZero: true, grid: {{ color: 'rgba(255,255,255,.08)' }} }}
        }}
      }}
    }});
  }})();
</script>
"#
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{LatencySample, PresenceEvent, ServerDetails};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn view() -> DashboardView {
        DashboardView {
            title: "Test <Dashboard>".to_string(),
            address: "localhost:25565".to_string(),
            refresh_interval: Duration::from_secs(60),
            tz: chrono_tz::UTC,
        }
    }

    fn online_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::initial(at(120));
        snapshot.online = true;
        snapshot.confidence = Some(Confidence::Direct);
        snapshot.online_since = Some(at(0));
        snapshot.uptime_seconds = 120;
        snapshot.participants = vec!["Alice".to_string(), "<b>Bob</b>".to_string()];
        snapshot.latency_history = vec![
            LatencySample {
                at: at(60),
                millis: Some(42),
            },
            LatencySample {
                at: at(120),
                millis: None,
            },
        ];
        snapshot.recent_events = vec![
            PresenceEvent {
                at: at(60),
                name: "Alice".to_string(),
                kind: PresenceKind::Join,
            },
            PresenceEvent {
                at: at(120),
                name: "<b>Bob</b>".to_string(),
                kind: PresenceKind::Join,
            },
        ];
        snapshot
    }

    #[test]
    fn test_fmt_duration() {
        assert_eq!(fmt_duration(Duration::ZERO), "0s");
        assert_eq!(fmt_duration(Duration::from_secs(59)), "59s");
        assert_eq!(fmt_duration(Duration::from_secs(3_600)), "1h 0s");
        assert_eq!(fmt_duration(Duration::from_secs(93_784)), "1d 2h 3m 4s");
        assert_eq!(fmt_duration(Duration::from_millis(1_999)), "1s");
    }

    #[test]
    fn test_fmt_time_uses_display_zone() {
        // 2023-11-14T22:13:20Z
        let ts = at(0);

        assert_eq!(fmt_time(ts, chrono_tz::UTC), "Nov 14, 10:13:20 PM");
        assert_eq!(
            fmt_time(ts, chrono_tz::America::Los_Angeles),
            "Nov 14, 02:13:20 PM"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("Steve"), "Steve");
    }

    #[test]
    fn test_render_online_page() {
        let html = render_dashboard(&online_snapshot(), &view(), at(180)).unwrap();

        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("<title>Test &lt;Dashboard&gt;</title>"));
        assert!(html.contains("Online ✅"));
        assert!(html.contains("<div class=\"kpi\">3m 0s</div>"));
        assert!(html.contains("<span class=\"tag\">Alice</span>"));
        assert!(html.contains("&lt;b&gt;Bob&lt;/b&gt;"));
        assert!(!html.contains("<b>Bob</b>"));
        assert!(html.contains("const values = [42,null];"));
        assert!(html.contains("let left = 60;"));
    }

    #[test]
    fn test_render_events_newest_first() {
        let html = render_dashboard(&online_snapshot(), &view(), at(180)).unwrap();

        let bob = html.find("JOIN</span> &lt;b&gt;Bob").unwrap();
        let alice = html.find("JOIN</span> Alice").unwrap();
        assert!(bob < alice);
    }

    #[test]
    fn test_render_offline_page() {
        let mut snapshot = Snapshot::initial(at(0));
        snapshot.last_error = Some("Timed out after 3000 ms".to_string());

        let html = render_dashboard(&snapshot, &view(), at(10)).unwrap();

        assert!(html.contains("Offline ❌"));
        assert!(html.contains("<div class=\"kpi\">—</div>"));
        assert!(html.contains("<span class=\"muted\">None</span>"));
        assert!(html.contains("No recent activity"));
        assert!(html.contains("Last error: Timed out after 3000 ms"));
    }

    #[test]
    fn test_render_marks_best_effort() {
        let mut snapshot = online_snapshot();
        snapshot.confidence = Some(Confidence::BestEffort);
        snapshot.server = ServerDetails {
            version: Some("Paper 1.20.4".to_string()),
            players_online: Some(2),
            players_max: Some(20),
        };

        let html = render_dashboard(&snapshot, &view(), at(180)).unwrap();

        assert!(html.contains("Online (best effort)"));
        assert!(html.contains("Version: Paper 1.20.4"));
        assert!(html.contains("<div class=\"kpi\">2 / 20</div>"));
    }

    #[test]
    fn test_refresh_seconds_never_zero() {
        let mut view = view();
        view.refresh_interval = Duration::from_millis(500);

        assert_eq!(view.refresh_seconds(), 1);
    }
}
