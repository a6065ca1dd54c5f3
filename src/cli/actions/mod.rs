pub mod server;

mod run;

/// What the CLI resolved to after parsing: one variant per subcommand-level
/// behavior, carrying its validated arguments.
#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
