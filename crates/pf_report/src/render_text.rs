//! crates/pf_report/src/render_text.rs
//! Plain-text renderer. Deterministic: no clock, no locale, fixed section order.

use core::fmt::Write;

use crate::structure::{BacktestModel, ReportModel};
use crate::{pct_2dp, ShareRow};

const DIGEST_CHARS: usize = 12;

// ------------------------- Text builder -------------------------

struct TextBuilder {
    buf: String,
}

impl TextBuilder {
    fn new() -> Self {
        Self { buf: String::with_capacity(4 * 1024) }
    }

    fn heading(&mut self, title: &str) {
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        let _ = writeln!(self.buf, "{title}");
        let _ = writeln!(self.buf, "{}", "-".repeat(title.chars().count()));
    }

    fn line(&mut self, s: &str) {
        let _ = writeln!(self.buf, "{s}");
    }

    fn share_table(&mut self, rows: &[ShareRow]) {
        let width = rows.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
        for r in rows {
            let _ = writeln!(self.buf, "  {:<width$}  {:>7}", r.name, pct_2dp(r.percent));
        }
    }

    fn finish(self) -> String {
        self.buf
    }
}

// ------------------------- Renderers -------------------------

pub fn render_text(m: &ReportModel) -> String {
    let mut t = TextBuilder::new();

    t.heading(&format!("Prediction: {}", m.cover.title));
    t.line(&format!("Completes: {}", m.cover.current));
    t.line(&format!(
        "Electorate: {}  Ballots: {:.2}  Turnout: {}",
        m.totals.total_voters,
        m.totals.total_votes,
        pct_2dp(m.totals.attendance_pct)
    ));

    t.heading("Shares");
    t.share_table(&m.shares);

    t.heading("Coverage");
    for c in &m.coverage {
        let rules = c.rules.iter().map(|(r, n)| format!("{r}={n}")).collect::<Vec<_>>().join(", ");
        t.line(&format!(
            "  {}: {}/{} units observed ({}), {} projected [{}]",
            c.dataset,
            c.observed_units,
            c.universe_units,
            pct_2dp(c.observed_pct),
            c.projected_units,
            rules
        ));
    }

    t.heading("Integrity");
    for d in &m.integrity.inputs {
        let short = d.sha256.get(..DIGEST_CHARS).unwrap_or(&d.sha256);
        t.line(&format!("  {}  sha256:{short}", d.dataset));
    }
    for v in &m.integrity.params {
        t.line(&format!("  {} = {}", v.key, v.value));
    }

    t.finish()
}

pub fn render_backtest_text(m: &BacktestModel) -> String {
    let mut t = TextBuilder::new();

    t.heading(&format!("Backtest: {}", m.title));
    t.line(&format!("Seed: {}", m.seed));

    t.heading("Final result");
    t.share_table(&m.truth);

    for r in &m.rows {
        t.heading(&format!("Sample {}% ({} units)", r.fraction_pct, r.sampled_units));
        t.line(&format!("  error (MSE, pp^2): {:.4}", r.error));
        t.share_table(&r.shares);
    }

    t.finish()
}

/* ---------------------------------- Tests --------------------------------- */
