//! Store characteristics and domain constants

/// Recommendation bucket boundaries (inclusive upper bounds)
pub mod buckets {
    /// Apps with at most this many recommendations fall into the low bucket
    pub const LOW_MAX_RECOMMENDATIONS: u32 = 50;

    /// Apps above the low bound and at most this many fall into the moderate bucket
    pub const MODERATE_MAX_RECOMMENDATIONS: u32 = 500;
}

/// Store payload vocabulary
pub mod store {
    /// Content descriptor id the store uses for adult-only sexual content
    pub const ADULT_ONLY_DESCRIPTOR_ID: u32 = 3;

    /// Tag attached to a detail record carrying the adult-only descriptor
    pub const ADULT_TAG: &str = "Adult";

    /// Placeholder written for missing text fields
    pub const NOT_AVAILABLE: &str = "N/A";

    /// Token written in the price column for apps without a price overview
    pub const FREE_TOKEN: &str = "Free";

    /// Separator used when joining multi-valued fields into one CSV cell
    pub const LIST_SEPARATOR: &str = ", ";
}

/// CSV layout shared by both output files
pub mod csv_schema {
    pub const COLUMNS: [&str; 8] = [
        "AppID",
        "Game Name",
        "Release Date",
        "Developer",
        "Genres",
        "Price ($)",
        "Recommendations",
        "Metacritic Score",
    ];
}
