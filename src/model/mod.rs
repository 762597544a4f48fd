mod account;
mod place;

pub use account::{Credentials, NewAccount, UserId};
pub use place::{
    split_tags, LikeKey, LikeRef, NewPlace, NewReport, Place, PlaceCandidate, PlaceRecord,
    ProfileRef, ANONYMOUS_AUTHOR, PLACEHOLDER_IMAGE,
};
