//! Shared identifiers for the scripted satellite dataset.

pub const BRAND_1_ID: i64 = 11;
pub const BRAND_1_NAME: &str = "Royal Panda";
pub const BRAND_2_ID: i64 = 12;
pub const BRAND_2_NAME: &str = "Spin Palace";
pub const BRAND_3_ID: i64 = 13;
pub const BRAND_3_NAME: &str = "Lucky Nugget";

pub const SLOT_1_ID: i64 = 21;
pub const SLOT_1_NAME: &str = "Book of Fortune";
pub const SLOT_2_ID: i64 = 22;
pub const SLOT_2_NAME: &str = "Starlight Spins";

/// Small page size so the brand import spans more than one page.
pub const TEST_PER_PAGE: u32 = 2;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;
