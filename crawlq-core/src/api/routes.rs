macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

pub const HEALTH: &str = "/health";

/// Versioned API route definitions shared by the server and its clients
pub mod v1 {
    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub mod queue {
        pub const REQUEST_WORK: &str = v1_path!("/queue/request-work");
        pub const HEARTBEAT: &str = v1_path!("/queue/heartbeat");
        pub const REPORT_FAILURE: &str = v1_path!("/queue/report-failure");
        pub const RELEASE: &str = v1_path!("/queue/release");
        pub const STATS: &str = v1_path!("/queue/stats");
    }
}
