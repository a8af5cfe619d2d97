//! HTML report rendering for a reasoning log.

use serde_json::Value;

use super::{escape_html, BalanceScore, ReasoningLog};

/// Characters of step content shown before truncating.
const STEP_SUMMARY_CHARS: usize = 400;

const STYLE: &str = r#"body { font-family: 'Segoe UI', sans-serif; color: #222; background: #fff; padding: 2em; }
h1, h2, h3 { color: #113356; }
ul { margin-left: 2em; }
li { margin-bottom: 0.6em; }
.block { margin-bottom: 2em; }
.step-table { border-collapse: collapse; width: 98%; }
.step-table th, .step-table td { border: 1px solid #bbb; padding: 7px 12px; text-align: left; }
.step-table th { background: #e5e9f5; }"#;

/// Render the full report.
///
/// Sections cover the root question, tree, steps, responses, reformulations,
/// feedback, node states and stage times; `score` adds a summary section.
pub fn render_html(log: &ReasoningLog, score: Option<&BalanceScore>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'/>\n");
    html.push_str("<title>Deliberative Report</title>\n<style>\n");
    html.push_str(STYLE);
    html.push_str("\n</style>\n</head>\n<body>\n");
    html.push_str("<h1>Deliberative Report - Critical Thinking</h1>\n");

    root_section(&mut html, log);
    tree_section(&mut html, log);
    steps_section(&mut html, log);
    responses_section(&mut html, log);
    focus_section(&mut html, log);
    feedback_section(&mut html, log);
    node_states_section(&mut html, log);
    times_section(&mut html, log);
    if let Some(score) = score {
        score_section(&mut html, score);
    }

    html.push_str("<hr/><p style='color:#888'>Generated by mcp-deliberative-inquiry</p>\n");
    html.push_str("</body>\n</html>\n");
    html
}

fn root_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>1. Root Question</h2>\n");
    html.push_str(&format!("<p>{}</p>\n</div>\n", escape_html(log.root())));
}

fn tree_section(html: &mut String, log: &ReasoningLog) {
    html.push_str(&format!(
        "<div class='block'>\n<h2>2. Sub-question Tree ({} nodes)</h2>\n<ul>\n",
        log.node_count()
    ));
    match log.inquiry() {
        Some(tree) => html.push_str(&tree.to_html_list()),
        None => html.push_str("<li><strong>&lt;no tree&gt;</strong></li>"),
    }
    html.push_str("\n</ul>\n</div>\n");
}

fn steps_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>3. Steps, Selections and Justifications</h2>\n");
    html.push_str("<table class='step-table'>\n<tr><th>Time</th><th>Action</th><th>Content</th><th>Context</th></tr>\n");
    for step in log.steps() {
        let context = step
            .context
            .iter()
            .map(|(k, v)| format!("{}: {}", k, display_value(v)))
            .collect::<Vec<_>>()
            .join("; ");
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            step.timestamp.to_rfc3339(),
            escape_html(&step.event_type),
            escape_html(&summarize(&step.content)),
            escape_html(&context),
        ));
    }
    html.push_str("</table>\n</div>\n");
}

fn responses_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>4. Multi-perspective Responses</h2>\n");
    let responses = log.responses();
    if responses.is_empty() {
        html.push_str("<p>No responses recorded.</p>\n</div>\n");
        return;
    }

    for (label, node_responses) in responses {
        html.push_str(&format!("<strong>{}</strong>\n<ul>\n", escape_html(label)));
        for response in node_responses {
            html.push_str(&format!(
                "<li><b>{}</b>: {}</li>\n",
                escape_html(&response.label),
                escape_html(&response.text)
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");
}

fn focus_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>5. Reformulation Suggestions</h2>\n");
    if log.focus().is_empty() {
        html.push_str("<p>No reformulations suggested.</p>\n</div>\n");
        return;
    }
    html.push_str("<ul>\n");
    for entry in log.focus() {
        html.push_str(&format!(
            "<li><b>Original:</b> {}<ul>",
            escape_html(&entry.original)
        ));
        for suggestion in &entry.suggestions {
            html.push_str(&format!("<li>{}</li>", escape_html(suggestion)));
        }
        html.push_str("</ul></li>\n");
    }
    html.push_str("</ul>\n</div>\n");
}

fn feedback_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>6. Feedback</h2>\n");
    if log.feedback().is_empty() {
        html.push_str("<p>No feedback recorded.</p>\n</div>\n");
        return;
    }
    for (node, entries) in log.feedback() {
        html.push_str(&format!("<strong>{}</strong>\n<ul>\n", escape_html(node)));
        for entry in entries {
            let kind = match entry.kind {
                super::FeedbackKind::Human => "Human",
                super::FeedbackKind::Ai => "AI",
            };
            html.push_str(&format!(
                "<li>{} <i>({}, {}, {})</i></li>\n",
                escape_html(&entry.comment),
                escape_html(&entry.author),
                kind,
                entry.timestamp.to_rfc3339()
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");
}

fn node_states_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>7. Node States</h2>\n");
    if log.node_states().is_empty() {
        html.push_str("<p>No node states recorded.</p>\n</div>\n");
        return;
    }
    html.push_str("<ul>\n");
    for (node, record) in log.node_states() {
        html.push_str(&format!(
            "<li>{}: <b>{}</b> <i>({})</i></li>\n",
            escape_html(node),
            record.state,
            record.timestamp.to_rfc3339()
        ));
    }
    html.push_str("</ul>\n</div>\n");
}

fn times_section(html: &mut String, log: &ReasoningLog) {
    html.push_str("<div class='block'>\n<h2>8. Stage Timeline</h2>\n<ul>\n");
    for marker in log.times() {
        let stage = match marker.stage {
            super::TrackedStage::Inquiry => "inquiry",
            super::TrackedStage::Responses => "responses",
            super::TrackedStage::Focus => "focus",
        };
        html.push_str(&format!(
            "<li>{}: {}</li>\n",
            stage,
            marker.timestamp.to_rfc3339()
        ));
    }
    html.push_str("</ul>\n</div>\n");
}

fn score_section(html: &mut String, score: &BalanceScore) {
    html.push_str("<div class='block'>\n<h2>9. Epistemic Balance</h2>\n<ul>\n");
    html.push_str(&format!("<li>Score: <b>{:.3}</b></li>\n", score.score));
    html.push_str(&format!("<li>Depth: {:.3}</li>\n", score.depth));
    html.push_str(&format!("<li>Plurality: {:.3}</li>\n", score.plurality));
    html.push_str(&format!("<li>Reversibility: {:.3}</li>\n", score.reversibility));
    if let Some(traceability) = score.traceability {
        html.push_str(&format!("<li>Traceability: {:.3}</li>\n", traceability));
    }
    if let Some(dispute) = score.dispute_robustness {
        html.push_str(&format!("<li>Dispute robustness: {:.3}</li>\n", dispute));
    }
    html.push_str("</ul>\n</div>\n");
}

/// One-line rendering of step content, truncated to [`STEP_SUMMARY_CHARS`].
fn summarize(content: &Value) -> String {
    let full = display_value(content);
    if full.chars().count() > STEP_SUMMARY_CHARS {
        let mut cut: String = full.chars().take(STEP_SUMMARY_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        full
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}
