use thiserror::Error;

#[derive(Error, Debug)]
pub enum GramflowError {
    /// The browser session failed underneath the engine.
    #[error("Browser session error: {0}")]
    Session(String),

    /// The session died while stepping through the carousel.
    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Page yielded no content images after {0} scan passes")]
    EmptyPage(u32),
}
