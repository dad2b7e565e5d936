pub mod channel;
pub mod conditions;
pub mod destination;
pub mod error;
pub mod meta;
pub mod reference;
pub mod subscription;

pub use channel::{
    Addressable, BackingChannelRef, ChannelClass, ChannelClassSpec, ChannelClassStatus,
    Channelable, ChannelableSpec, ChannelableStatus, SubscriberSpec, SubscriberStatus,
};
pub use conditions::{Condition, ConditionSet, ConditionStatus, CONDITION_READY};
pub use destination::{BackoffPolicy, DeliverySpec, Destination, is_nil_or_empty_destination};
pub use error::{CoreError, ErrorCategory, Result};
pub use meta::{ObjectMeta, TypeMeta, object_reference};
pub use reference::{GroupVersion, KReference, ObjectReference};
pub use subscription::{
    CONDITION_ADDED_TO_CHANNEL, CONDITION_CHANNEL_READY, CONDITION_REFERENCES_RESOLVED,
    PhysicalSubscription, Subscription, SubscriptionSpec, SubscriptionStatus,
    SUBSCRIPTION_API_VERSION, SUBSCRIPTION_CONDITION_SET, SUBSCRIPTION_FINALIZER,
    SUBSCRIPTION_KIND,
};
