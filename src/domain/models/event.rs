/// Notifications emitted by the gateway for whoever owns the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Stored tokens were rotated by a successful refresh.
    TokensRefreshed(),
    /// Recovery failed and stored tokens were cleared. The user has to log in
    /// again.
    SessionExpired(),
}
