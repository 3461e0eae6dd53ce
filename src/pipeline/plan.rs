//! The ordered stage list.

use crate::config::{RuntimeEnv, ServerOptions};

/// One pipeline stage, listed outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    RequestId,
    AccessLog,
    ErrorBoundary,
    PanicCapture,
    AcceptNegotiation,
    UserAgentConnection,
    SanitizePath,
    Cors,
    Authorization,
    BodyParser,
    QueryParser,
    Compression,
    Etag,
    ConditionalRequest,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::RequestId => "request_id",
            Stage::AccessLog => "access_log",
            Stage::ErrorBoundary => "error_boundary",
            Stage::PanicCapture => "panic_capture",
            Stage::AcceptNegotiation => "accept",
            Stage::UserAgentConnection => "user_agent_connection",
            Stage::SanitizePath => "sanitize_path",
            Stage::Cors => "cors",
            Stage::Authorization => "authorization",
            Stage::BodyParser => "body_parser",
            Stage::QueryParser => "query_parser",
            Stage::Compression => "compression",
            Stage::Etag => "etag",
            Stage::ConditionalRequest => "conditional_request",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Stages for a server, in order. Access logging is left out in test mode
/// and body parsing unless enabled; omitted stages do not run at all.
pub fn plan(options: &ServerOptions, env: &RuntimeEnv) -> Vec<Stage> {
    let mut stages = vec![Stage::RequestId];
    if !env.test_mode {
        stages.push(Stage::AccessLog);
    }
    stages.extend([
        Stage::ErrorBoundary,
        Stage::PanicCapture,
        Stage::AcceptNegotiation,
        Stage::UserAgentConnection,
        Stage::SanitizePath,
        Stage::Cors,
        Stage::Authorization,
    ]);
    if options.body_parser.enabled {
        stages.push(Stage::BodyParser);
    }
    stages.extend([
        Stage::QueryParser,
        Stage::Compression,
        Stage::Etag,
        Stage::ConditionalRequest,
    ]);
    stages
}
