// Stat bounds
pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;

// Breeding
pub const BREEDING_AGE_LIMIT: i32 = 20; // parents must be strictly younger
pub const STAT_OFFSET_RANGE: i32 = 10; // child stat offset in [-10, 10]

// Combat
pub const FIGHTING_MIN_AGE: i32 = 10;
pub const LIFE_OFFSET_RANGE: i32 = 10; // life score offset in [-10, 10]

// Naming
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 10;
pub const CONSONANTS: &[u8; 20] = b"bcdfghjklmnpqrstvwxz";
pub const VOWELS: &[u8; 6] = b"aeiouy";

// Naming retries
pub const MAX_NAME_ATTEMPTS: usize = 16; // candidate child names checked per birth
