use anyhow::Context;
use devlens::{review_code, CodeReview, Generator};
use std::path::Path;

use crate::output::{print_json, print_table};

fn review_rows(review: &CodeReview) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["summary".to_string(), review.summary.clone()],
        vec!["score".to_string(), review.score.to_string()],
        vec![
            "approved".to_string(),
            if review.approved { "yes" } else { "no" }.to_string(),
        ],
        vec!["severity".to_string(), review.severity.to_string()],
    ];
    rows.extend(
        review
            .issues
            .iter()
            .map(|issue| vec!["issue".to_string(), issue.clone()]),
    );
    rows.extend(
        review
            .suggestions
            .iter()
            .map(|s| vec!["suggestion".to_string(), s.clone()]),
    );
    rows
}

pub async fn run(
    generator: &Generator,
    file: &Path,
    context: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let code = super::read_input(file)?;
    let review = review_code(generator, &code, context)
        .await
        .with_context(|| format!("review of {} failed", file.display()))?;

    if json {
        print_json(&review)
    } else {
        print_table(&["FIELD", "VALUE"], &review_rows(&review));
        Ok(())
    }
}
