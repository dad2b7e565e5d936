//! Folds the Channel's per-subscriber status into the ChannelReady condition.

use fanout_core::{Channelable, ConditionStatus, Subscription};

use crate::error::{ReconcileError, reasons};

pub fn check_channel_status_for_subscription(
    channel: &Channelable,
    sub: &mut Subscription,
) -> Result<(), ReconcileError> {
    // only a status for the current generation counts
    let Some(status) = channel.subscriber_status(sub.uid(), sub.generation()) else {
        let message = format!(
            "Failed to get subscription status: subscription {:?} not present in channel {:?} subscriber's list",
            sub.name(),
            channel.name()
        );
        tracing::warn!(subscription = %sub.name(), channel = %channel.name(), "Failed to get subscription status.");
        sub.status
            .mark_channel_unknown(reasons::SUBSCRIPTION_NOT_MARKED_READY_BY_CHANNEL, message.clone());
        return Err(ReconcileError::new(
            reasons::SUBSCRIPTION_NOT_MARKED_READY_BY_CHANNEL,
            message,
        ));
    };

    match status.ready {
        ConditionStatus::True => sub.status.mark_channel_ready(),
        ConditionStatus::Unknown => sub.status.mark_channel_unknown(
            reasons::SUBSCRIPTION_NOT_MARKED_READY_BY_CHANNEL,
            "Subscription marked by Channel as Unknown",
        ),
        ConditionStatus::False => sub.status.mark_channel_failed(
            reasons::SUBSCRIPTION_NOT_MARKED_READY_BY_CHANNEL,
            "Subscription marked by Channel as False",
        ),
    }
    Ok(())
}
