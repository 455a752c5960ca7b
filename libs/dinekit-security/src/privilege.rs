/// Assertion, made by the caller's authorization layer, that the current actor
/// holds an administrative role.
///
/// This type carries no authority of its own. It only makes the bypass of tenant
/// scoping explicit at the call site: the escape hatch refuses to open without a
/// non-empty assertion, and nothing in Dinekit creates one from ambient state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivilegeAssertion {
    role: String,
}

impl PrivilegeAssertion {
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.trim().is_empty()
    }
}
