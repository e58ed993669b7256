/// Receives the redirect-to-login side effect once a session is lost.
///
/// A browser embedding would perform a full page load to `route`; a CLI
/// prints a hint. Any `Fn(&str)` closure works.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to_login(&self, route: &str) {
        self(route)
    }
}

/// Navigator that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self, route: &str) {
        tracing::debug!(route, "Session lost; no navigator configured");
    }
}
