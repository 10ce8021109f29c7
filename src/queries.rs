use crate::backend::{Query, SqlParam};

// --- Overview ---

pub const TOTAL_USERS: &str = "SELECT COUNT(*) AS count FROM users";
pub const ACTIVE_SUBSCRIPTIONS: &str = "SELECT COUNT(*) AS count FROM vw_active_subscriptions";
pub const TOTAL_TITLES: &str = "SELECT COUNT(*) AS count FROM titles";
pub const TOTAL_WATCHES: &str = "SELECT COUNT(*) AS count FROM watch_history";
pub const REVENUE_ANALYSIS: &str = "SELECT * FROM vw_revenue_analysis";

// --- User activity ---

pub const USER_ACTIVITY_TOP: &str =
    "SELECT TOP 50 * FROM vw_user_activity_summary ORDER BY watch_time_hours DESC";

pub const COUNTRY_ENGAGEMENT: &str =
    "SELECT * FROM vw_country_engagement ORDER BY user_count DESC";

pub const WATCH_PERCENTAGE_PER_USER: &str = "
    SELECT
        u.user_id,
        u.name,
        ROUND(AVG(wh.watch_percentage * 100), 2) AS avg_watch_percentage,
        COUNT(wh.watch_id) AS total_watches,
        SUM(wh.completed) AS completed_watches
    FROM users u
    LEFT JOIN watch_history wh ON u.user_id = wh.user_id
    GROUP BY u.user_id, u.name
    ORDER BY avg_watch_percentage DESC;";

pub const TOP_COMPLETERS: &str = "
    SELECT TOP 10
        u.user_id,
        u.name,
        SUM(wh.completed) AS completed_watches
    FROM users u
    JOIN watch_history wh ON u.user_id = wh.user_id
    GROUP BY u.user_id, u.name
    ORDER BY completed_watches DESC;";

pub const AGE_GROUP_BEHAVIOR: &str = "
    WITH age_groups AS (
    SELECT
        u.user_id,
        CASE
            WHEN u.age < 18 THEN 'Under 18'
            WHEN u.age BETWEEN 18 AND 24 THEN '18-24'
            WHEN u.age BETWEEN 25 AND 34 THEN '25-34'
            WHEN u.age BETWEEN 35 AND 44 THEN '35-44'
            WHEN u.age BETWEEN 45 AND 54 THEN '45-54'
            WHEN u.age BETWEEN 55 AND 64 THEN '55-64'
            ELSE '65+'
        END AS age_group,
        s.subscription_type
    FROM users u
    JOIN subscriptions s ON u.user_id = s.user_id
    )
    SELECT
        ag.age_group,
        ag.subscription_type,
        COUNT(DISTINCT ag.user_id) AS users_in_segment,
        COUNT(wh.watch_id) AS total_watch_events,
        ROUND(AVG(CAST(wh.watch_percentage AS FLOAT)) * 100, 2) AS avg_watch_percentage,
        ROUND(SUM(CAST(wh.watch_percentage AS FLOAT)) * 100, 2) AS total_watch_percentage
    FROM age_groups ag
    LEFT JOIN watch_history wh ON ag.user_id = wh.user_id
    GROUP BY ag.age_group, ag.subscription_type
    ORDER BY ag.age_group, ag.subscription_type;";

// --- Genre performance ---

pub const GENRE_PERFORMANCE: &str =
    "SELECT * FROM vw_genre_performance ORDER BY total_watches DESC";

pub const TITLE_ANALYSIS: &str = "
    SELECT TOP 50
        t.title, t.release_year, t.imdb_score,
        COUNT(wh.watch_id) AS total_watches,
        ROUND(AVG(wh.watch_percentage), 2) AS avg_watch_percentage
    FROM titles t
    LEFT JOIN watch_history wh ON t.title_id = wh.title_id
    GROUP BY t.title, t.release_year, t.imdb_score
    ORDER BY total_watches DESC";

pub const TITLE_COMPLETION_RATES: &str = "
    SELECT TOP 20
        t.title,
        ROUND(AVG(wh.watch_percentage * 100), 2) AS avg_watch_percentage,
        SUM(wh.completed) AS total_completed
    FROM titles t
    JOIN watch_history wh ON t.title_id = wh.title_id
    GROUP BY t.title
    ORDER BY avg_watch_percentage DESC, total_completed DESC;";

pub const GENRE_TRENDS: &str = "EXEC sp_get_genre_trends";

// --- Subscription & revenue ---

pub const SUBSCRIPTION_REVENUE: &str = "
    SELECT subscription_type, COUNT(subscription_id) AS subscriber_count,
           SUM(monthly_fee) AS total_monthly_revenue,
           ROUND(AVG(monthly_fee), 2) AS avg_fee
    FROM subscriptions
    WHERE subscription_status = 'active'
    GROUP BY subscription_type";

pub const TOP_LIFETIME_VALUE: &str = "
    SELECT TOP 10 u.user_id, u.name, dbo.fn_calculate_user_ltv(u.user_id) AS lifetime_value
    FROM users u
    ORDER BY lifetime_value DESC";

// --- Cross analysis ---

pub const COUNTRY_GENRE_ENGAGEMENT: &str = "
    SELECT
        u.country,
        g.name AS genre,
        ROUND(AVG(wh.watch_percentage * 100), 2) AS avg_watch_percentage,
        COUNT(wh.watch_id) AS total_watches
    FROM users u
    JOIN watch_history wh ON u.user_id = wh.user_id
    JOIN title_genres tg ON wh.title_id = tg.title_id
    JOIN genres g ON tg.genre_id = g.genre_id
    GROUP BY u.country, g.name
    ORDER BY u.country, avg_watch_percentage DESC;";

pub const ENGAGED_LOW_VALUE_USERS: &str = "
    SELECT
        u.user_id,
        u.name,
        ROUND(AVG(wh.watch_percentage * 100), 2) AS avg_watch_percentage,
        dbo.fn_calculate_user_ltv(u.user_id) AS lifetime_value
    FROM users u
    JOIN watch_history wh ON u.user_id = wh.user_id
    GROUP BY u.user_id, u.name
    HAVING AVG(wh.watch_percentage) > 0.8 AND dbo.fn_calculate_user_ltv(u.user_id) < 50
    ORDER BY avg_watch_percentage DESC;";

// --- Recommender demo ---

pub const USER_PICKER: &str = "SELECT user_id, name FROM users";
pub const TITLE_PICKER: &str = "SELECT title_id, title FROM titles ORDER BY title";

pub const USER_WATCH_TIME_SQL: &str =
    "SELECT name, watch_time_hours FROM users WHERE user_id = ?";

pub const RECENT_WATCH_HISTORY_SQL: &str =
    "SELECT TOP 5 * FROM watch_history WHERE user_id = ? ORDER BY created_at DESC";

pub const USER_RECOMMENDATIONS_SQL: &str =
    "EXEC sp_get_user_recommendations @p_user_id = ?, @p_limit = ?";

pub const INSERT_WATCH_SQL: &str = "
    INSERT INTO watch_history
    (user_id, title_id, watch_percentage, completed, created_at, updated_at)
    VALUES (?, ?, ?, ?, SYSDATETIME(), SYSDATETIME())";

/// Total watch time for one user. Every user-chosen value is bound, never
/// spliced into the SQL text.
pub fn user_watch_time(user_id: &str) -> Query {
    Query::new(USER_WATCH_TIME_SQL).bind(SqlParam::Text(user_id.to_string()))
}

pub fn recent_watch_history(user_id: &str) -> Query {
    Query::new(RECENT_WATCH_HISTORY_SQL).bind(SqlParam::Text(user_id.to_string()))
}

pub fn user_recommendations(user_id: &str, limit: u32) -> Query {
    Query::new(USER_RECOMMENDATIONS_SQL)
        .bind(SqlParam::Text(user_id.to_string()))
        .bind(SqlParam::Int(i64::from(limit)))
}

/// A watch event; `fraction` is the watched share in `0.0..=1.0`.
pub fn insert_watch(user_id: &str, title_id: &str, fraction: f64) -> Query {
    Query::new(INSERT_WATCH_SQL)
        .bind(SqlParam::Text(user_id.to_string()))
        .bind(SqlParam::Text(title_id.to_string()))
        .bind(SqlParam::Float(fraction))
        .bind(SqlParam::Int(0))
}
