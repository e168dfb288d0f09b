/// Reporter label used when an incident is anonymous or has no display identity
pub const ANONYMOUS_REPORTER: &str = "Anonymous";

/// Maximum page size for public listings
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default page size for public search and feed
pub const DEFAULT_PUBLIC_PAGE_SIZE: i64 = 50;

/// Default page size for the domain ranking
pub const DEFAULT_RANKING_PAGE_SIZE: i64 = 5;

/// Default trailing window (days) for the domain ranking
pub const DEFAULT_RANKING_WINDOW_DAYS: i32 = 30;

/// Default trailing window (days) for random feed sampling
pub const DEFAULT_FEED_WINDOW_DAYS: i32 = 180;

/// Longest accepted trailing window (days)
pub const MAX_WINDOW_DAYS: i32 = 365;

/// Path of the public search endpoint, used to build ranking links
pub const PUBLIC_SEARCH_PATH: &str = "/api/public/reports/search";
