/// Registration progress of one client. `Registered` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    AwaitingResponse,
    Registered,
    Failed,
}

impl RegistrationState {
    /// A registration response has been handled, successfully or not.
    pub fn is_processed(&self) -> bool {
        matches!(self, RegistrationState::Registered | RegistrationState::Failed)
    }
}
