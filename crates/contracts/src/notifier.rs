//! Notifier trait - engine-to-principal messaging interface

use crate::principal::PrincipalId;

/// Outbound notification channel back to a principal
///
/// Delivery is best effort: the engine never aborts a dispatch because a
/// status message could not be sent. Implementations log their own failures.
#[trait_variant::make(Notifier: Send)]
pub trait LocalNotifier {
    /// Send a plain-text status message to the principal
    async fn notify(&self, principal: PrincipalId, text: &str);
}
