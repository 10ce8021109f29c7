use crate::backend::{CellValue, DriverCatalog, Query, QueryResult};
use crate::error::DashError;
use crate::executor::QueryExecutor;
use crate::queries;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Page {
    Overview,
    UserActivity,
    GenrePerformance,
    SubscriptionRevenue,
    CrossAnalysis,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Platform Overview",
            Page::UserActivity => "User Activity Analysis",
            Page::GenrePerformance => "Genre & Titles Performance Analysis",
            Page::SubscriptionRevenue => "Subscription & Revenue Analytics",
            Page::CrossAnalysis => "Cross-Analysis: Content vs User Engagement",
        }
    }

    fn panels(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Page::Overview => &[("Revenue Analysis", queries::REVENUE_ANALYSIS)],
            Page::UserActivity => &[
                ("User Activity Summary", queries::USER_ACTIVITY_TOP),
                ("Engagement by Country", queries::COUNTRY_ENGAGEMENT),
                ("Average watch percentage per user", queries::WATCH_PERCENTAGE_PER_USER),
                ("Top users by completed titles", queries::TOP_COMPLETERS),
                (
                    "Watch Behavior by Subscription Type & Age Group",
                    queries::AGE_GROUP_BEHAVIOR,
                ),
            ],
            Page::GenrePerformance => &[
                ("Genre Metrics", queries::GENRE_PERFORMANCE),
                ("Title-Level Analysis", queries::TITLE_ANALYSIS),
                ("Titles with highest completion rates", queries::TITLE_COMPLETION_RATES),
                ("Genre with highest engagement score", queries::GENRE_TRENDS),
            ],
            Page::SubscriptionRevenue => &[
                ("Revenue by Subscription Type", queries::SUBSCRIPTION_REVENUE),
                ("Top Users by Lifetime Value", queries::TOP_LIFETIME_VALUE),
            ],
            Page::CrossAnalysis => &[
                ("Engagement by Country & Genre", queries::COUNTRY_GENRE_ENGAGEMENT),
                (
                    "Users with high watch percentage but low subscription revenue",
                    queries::ENGAGED_LOW_VALUE_USERS,
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: &'static str,
    pub value: Option<i64>,
}

impl Metric {
    pub fn display(&self) -> String {
        self.value.map(format_count).unwrap_or_else(|| "n/a".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: &'static str,
    pub result: Arc<QueryResult>,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page: Page,
    pub metrics: Vec<Metric>,
    pub panels: Vec<Panel>,
}

/// Group digits in thousands: 1204 -> "1,204".
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn fetch<C: DriverCatalog>(
    executor: &mut QueryExecutor<C>,
    query: &Query,
    strict: bool,
) -> Result<Arc<QueryResult>, DashError> {
    if strict {
        executor.try_run(query)
    } else {
        Ok(executor.rows(query))
    }
}

/// Run every query behind `page`.
///
/// Non-strict rendering shows a failed panel as empty, with the failure
/// already reported through the executor's notifier. Strict rendering stops
/// at the first failure.
pub fn render<C: DriverCatalog>(
    executor: &mut QueryExecutor<C>,
    page: Page,
    strict: bool,
) -> Result<RenderedPage, DashError> {
    let mut metrics = Vec::new();
    if page == Page::Overview {
        for (label, sql) in [
            ("Total Users", queries::TOTAL_USERS),
            ("Active Subscriptions", queries::ACTIVE_SUBSCRIPTIONS),
            ("Total Titles", queries::TOTAL_TITLES),
            ("Total Watches", queries::TOTAL_WATCHES),
        ] {
            let result = fetch(executor, &Query::new(sql), strict)?;
            metrics.push(Metric {
                label,
                value: result.get(0, "count").and_then(|v| v.as_i64()),
            });
        }
    }

    let mut panels = Vec::new();
    for &(title, sql) in page.panels() {
        let result = fetch(executor, &Query::new(sql), strict)?;
        panels.push(Panel { title, result });
    }

    Ok(RenderedPage {
        page,
        metrics,
        panels,
    })
}

#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub user_id: String,
    pub title_id: String,
    /// Percentage watched, 0..=100.
    pub watch_percentage: u8,
    /// Number of recommendations, 1..=50.
    pub recommendations: u32,
}

#[derive(Debug, Clone)]
pub struct WatchOutcome {
    pub watch_time: Arc<QueryResult>,
    pub recent_history: Arc<QueryResult>,
    pub recommendations: Arc<QueryResult>,
}

impl WatchRequest {
    fn validate(&self) -> Result<(), DashError> {
        if self.user_id.trim().is_empty() {
            return Err(DashError::Validation {
                reason: "user id must not be empty".to_string(),
            });
        }
        if self.title_id.trim().is_empty() {
            return Err(DashError::Validation {
                reason: "title id must not be empty".to_string(),
            });
        }
        if self.watch_percentage > 100 {
            return Err(DashError::Validation {
                reason: format!(
                    "watch percentage must be between 0 and 100, got {}",
                    self.watch_percentage
                ),
            });
        }
        if !(1..=50).contains(&self.recommendations) {
            return Err(DashError::Validation {
                reason: format!(
                    "recommendation count must be between 1 and 50, got {}",
                    self.recommendations
                ),
            });
        }
        Ok(())
    }
}

/// Record a watch event, then read back the user's stats and recommendations.
///
/// The reads go through the cache, so a repeat for the same user within the
/// TTL shows the values cached before this write unless the executor
/// invalidates on write.
pub fn simulate_watch<C: DriverCatalog>(
    executor: &mut QueryExecutor<C>,
    request: &WatchRequest,
) -> Result<WatchOutcome, DashError> {
    request.validate()?;

    let fraction = f64::from(request.watch_percentage) / 100.0;
    executor.execute(&queries::insert_watch(
        &request.user_id,
        &request.title_id,
        fraction,
    ))?;

    let outcome = WatchOutcome {
        watch_time: executor.rows(&queries::user_watch_time(&request.user_id)),
        recent_history: executor.rows(&queries::recent_watch_history(&request.user_id)),
        recommendations: executor.rows(&queries::user_recommendations(
            &request.user_id,
            request.recommendations,
        )),
    };
    if outcome.recommendations.is_empty() {
        executor.notifier().info("No recommendations available yet.");
    }
    Ok(outcome)
}

/// Every user, as `user_id` and `name`.
pub fn users<C: DriverCatalog>(
    executor: &mut QueryExecutor<C>,
) -> Result<Arc<QueryResult>, DashError> {
    let result = executor.try_run(&Query::new(queries::USER_PICKER))?;
    if result.is_empty() {
        executor.notifier().info("No users available.");
    }
    Ok(result)
}

/// Every title ordered by name, as `title_id` and `title`.
pub fn titles<C: DriverCatalog>(
    executor: &mut QueryExecutor<C>,
) -> Result<Arc<QueryResult>, DashError> {
    let result = executor.try_run(&Query::new(queries::TITLE_PICKER))?;
    if result.is_empty() {
        executor.notifier().info("No titles available.");
    }
    Ok(result)
}

fn cell_text(value: &CellValue) -> Option<String> {
    value
        .as_str()
        .map(str::to_string)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
}

/// Resolve a title given either by id or by its exact name to its id.
pub fn resolve_title<C: DriverCatalog>(
    executor: &mut QueryExecutor<C>,
    title: &str,
) -> Result<String, DashError> {
    let catalog = titles(executor)?;
    let (Some(id_col), Some(name_col)) =
        (catalog.column_index("title_id"), catalog.column_index("title"))
    else {
        return Err(DashError::Query {
            message: "title list is missing the title_id or title column".to_string(),
        });
    };

    let ids = catalog
        .rows
        .iter()
        .filter_map(|row| Some((cell_text(row.get(id_col)?)?, row.get(name_col)?)));
    let mut by_name = None;
    for (id, name) in ids {
        if id == title {
            return Ok(id);
        }
        if by_name.is_none() && name.as_str() == Some(title) {
            by_name = Some(id);
        }
    }
    by_name.ok_or_else(|| DashError::Validation {
        reason: format!("unknown title: {}", title),
    })
}
