// Plain-text job overview
//
// Column widths follow the longest value in the current listing, so the
// table stays aligned whatever names and plans are scheduled.

use crate::models::JobListing;

const JOB_HEADER: &str = "Job";
const PLAN_HEADER: &str = "Time plan";
const NEXT_HEADER: &str = "Next recording";

/// Text shown when nothing is scheduled
pub const NO_JOBS: &str = "Currently no jobs scheduled";

fn next_run_cell(listing: &JobListing) -> String {
    match (listing.enabled, listing.next_run) {
        (false, _) => "disabled".to_string(),
        (true, Some(next)) => next.format("%Y-%m-%d %H:%M:%S").to_string(),
        (true, None) => "never".to_string(),
    }
}

/// Render the listings as an aligned table
pub fn render_listing(listings: &[JobListing]) -> String {
    if listings.is_empty() {
        return format!("{}\n", NO_JOBS);
    }

    let rows: Vec<[String; 3]> = listings
        .iter()
        .map(|l| [l.name.clone(), l.schedule.clone(), next_run_cell(l)])
        .collect();

    let job_width = rows
        .iter()
        .map(|row| row[0].chars().count())
        .chain(std::iter::once(JOB_HEADER.len()))
        .max()
        .unwrap_or(JOB_HEADER.len());
    let plan_width = rows
        .iter()
        .map(|row| row[1].chars().count())
        .chain(std::iter::once(PLAN_HEADER.len()))
        .max()
        .unwrap_or(PLAN_HEADER.len());

    let line = |job: &str, plan: &str, next: &str| {
        format!(
            "{:<job_width$}  {:<plan_width$}  {}",
            job,
            plan,
            next,
            job_width = job_width,
            plan_width = plan_width
        )
    };

    let header = line(JOB_HEADER, PLAN_HEADER, NEXT_HEADER);
    let mut out = String::new();
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"=".repeat(header.chars().count()));
    out.push('\n');
    for [job, plan, next] in &rows {
        out.push_str(&line(job, plan, next));
        out.push('\n');
    }
    out
}
