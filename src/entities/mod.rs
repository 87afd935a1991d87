//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod campaign;
pub mod campaign_category;
pub mod campaign_tag;
pub mod campaign_update;
pub mod category;
pub mod donation;
pub mod donor_group;
pub mod event;
pub mod group_membership;
pub mod group_message;
pub mod group_message_read_state;
pub mod notification;
pub mod tag;
pub mod user;

// Re-export specific types to avoid conflicts
pub use campaign::{Column as CampaignColumn, Entity as Campaign, Model as CampaignModel};
pub use campaign_category::{
    Column as CampaignCategoryColumn, Entity as CampaignCategory, Model as CampaignCategoryModel,
};
pub use campaign_tag::{Column as CampaignTagColumn, Entity as CampaignTag, Model as CampaignTagModel};
pub use campaign_update::{
    Column as CampaignUpdateColumn, Entity as CampaignUpdate, Model as CampaignUpdateModel,
};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use donation::{
    Column as DonationColumn, DonationStatus, Entity as Donation, Model as DonationModel,
};
pub use donor_group::{Column as DonorGroupColumn, Entity as DonorGroup, Model as DonorGroupModel};
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use group_membership::{
    Column as GroupMembershipColumn, Entity as GroupMembership, Model as GroupMembershipModel,
};
pub use group_message::{
    Column as GroupMessageColumn, Entity as GroupMessage, Model as GroupMessageModel,
};
pub use group_message_read_state::{
    Column as ReadStateColumn, Entity as GroupMessageReadState, Model as ReadStateModel,
};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
    NotificationKind,
};
pub use tag::{Column as TagColumn, Entity as Tag, Model as TagModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole};
