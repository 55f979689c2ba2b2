mod compile;
mod fuzz;
mod logging;
mod render;
mod sandbox;
mod timeline;
mod transport;

pub use compile::{CompileSnapshot, CompileWorkflow, fallback_compile_response};
pub use fuzz::{
    DEFAULT_FUZZ_POLL_INTERVAL, FuzzControlError, FuzzSnapshot, FuzzWorkflow,
};
pub use logging::{
    category_compile, category_fuzz, category_sandbox, init as init_logging, level_label,
    source_label,
};
pub use render::{
    MEMORY_GAUGE_FULL_SCALE_MB, gauge_percent, render_campaign, render_compile, render_crash,
    render_health, render_log_entry, render_project, render_resources, render_run,
};
pub use sandbox::{
    MEMORY_LIMIT_OPTIONS, SandboxConfigError, SandboxSnapshot, SandboxWorkflow, TIMEOUT_OPTIONS,
    validate_run_request,
};
pub use timeline::{
    DEFAULT_TIMELINE_REFRESH_INTERVAL, LevelFilter, TimelineFeed, TimelineFilter,
    TimelineSnapshot,
};
pub use transport::{ApiClient, TransportError};
