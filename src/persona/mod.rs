//! Reference personalities: synthetic user profiles under test.
//!
//! # Architecture
//!
//! ```text
//! BasePersonality (loaded once, read-only)
//!   + [PersonalityExtension, ...]  (ordered, keyed per base)
//!   ↓  PersonalityComposer::compose
//! ReferencePersonality (rebuilt per test case, never persisted)
//! ```

pub mod composer;
pub mod profile;

pub use composer::{materialize, PersonalityComposer};
pub use profile::{
    category, BasePersonality, ConversationDocument, ConversationMessage, ExpectedBehavior,
    MemoryFact, MemoryFactBuilder, PersonalityExtension, PersonalityMemoryBuilder,
    PersonalityPlan, PersonalityProfile, ReferencePersonality,
};
