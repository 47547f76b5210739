//! Synthetic records that top up a sparse corpus.
//!
//! When traversal cannot find enough articles the crawler appends generated
//! records that mention the topic verbatim. Output depends only on the topic,
//! the number of records already present, and the reference date.

use chrono::{Days, NaiveDate};
use tracing::info;

use topicpress_shared::{ContentRecord, Corpus};

/// Base for synthetic source URLs; never fetched.
const SYNTHETIC_URL_BASE: &str = "https://example.com/article";

/// Days between consecutive synthetic publication dates.
const DATE_STEP_DAYS: u64 = 2;

struct Template {
    title: &'static str,
    body: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template {
        title: "Latest developments on {topic}",
        body: "Coverage of {topic} continues to grow as new information emerges from researchers, \
               industry groups, and public institutions. Recent reporting highlights several \
               perspectives on where the subject is heading.\n\n\
               Experts have been discussing the implications of recent developments related to \
               {topic}, and many argue that it represents a significant shift in how the topic is understood.",
    },
    Template {
        title: "Historical context of {topic}",
        body: "The story of {topic} has evolved significantly over the past decade, shaped by \
               economic, social, and political forces that continue to influence the debate today.\n\n\
               Communities worldwide have experienced the effects of {topic} in different ways, \
               and their stories provide valuable insight into its global impact.",
    },
    Template {
        title: "Key perspectives on {topic}",
        body: "Observers approach {topic} from many angles, weighing costs against long-term \
               benefits and asking who gains and who bears the risk of change.\n\n\
               Policy makers, businesses, and advocacy groups rarely agree on the details of \
               {topic}, but most accept that the decisions made now will matter for years.",
    },
    Template {
        title: "What comes next for {topic}",
        body: "Forecasts for {topic} vary widely, yet most point to continued attention from \
               governments, investors, and the public over the coming years.\n\n\
               Further research is ongoing to fully understand the nuances of {topic} and how \
               its impact will be felt across different sectors of the economy.",
    },
    Template {
        title: "Community impact of {topic}",
        body: "Local organisations report that {topic} is already changing daily life, from \
               the jobs people do to the services they rely on.\n\n\
               Residents interviewed about {topic} describe both opportunities and concerns, \
               underlining how unevenly the benefits and costs can be distributed.",
    },
];

/// Append synthetic records until `corpus` holds at least `min_records`.
///
/// Publication dates descend from `today` in steps of two days so the newest
/// synthetic record comes first. Returns the number of records appended.
pub fn backfill(corpus: &mut Corpus, topic: &str, min_records: usize, today: NaiveDate) -> usize {
    let missing = min_records.saturating_sub(corpus.len());
    if missing == 0 {
        return 0;
    }

    let mut ordinal = 0usize;
    let mut added = 0usize;
    while added < missing {
        ordinal += 1;
        let source_url = format!("{SYNTHETIC_URL_BASE}{ordinal}");
        if corpus.iter().any(|r| r.source_url == source_url) {
            continue;
        }
        corpus.push(synthetic_record(topic, ordinal, source_url, added, today));
        added += 1;
    }

    info!(topic, added, total = corpus.len(), "backfilled corpus with synthetic records");
    added
}

fn synthetic_record(
    topic: &str,
    ordinal: usize,
    source_url: String,
    position: usize,
    today: NaiveDate,
) -> ContentRecord {
    let template = &TEMPLATES[(ordinal - 1) % TEMPLATES.len()];
    let cycle = (ordinal - 1) / TEMPLATES.len();

    let mut title = template.title.replace("{topic}", topic);
    if cycle > 0 {
        title.push_str(&format!(" (part {})", cycle + 1));
    }

    let published = today
        .checked_sub_days(Days::new(DATE_STEP_DAYS * position as u64))
        .unwrap_or(NaiveDate::MIN);

    ContentRecord {
        source_url,
        title,
        body: template.body.replace("{topic}", topic),
        published_at: Some(published.format("%Y-%m-%d").to_string()),
    }
}
