//! Game constants and the bit layouts shared by the whole crate.
//!
//! Roll layout: counts of sides 1..6 packed three bits apiece into a `u32`,
//! so two rolls merge by integer addition. Game layout (low to high):
//!
//! | Bits  | Field                  |
//! |-------|------------------------|
//! | 0..12 | filled-category mask   |
//! | 13    | Yahtzee bonus flag     |
//! | 14..19| capped upper-half sum  |

/// Dice per complete roll.
pub const N_DICE: usize = 5;

/// Sides per die.
pub const N_SIDES: usize = 6;

/// Bits per side-count field in the packed roll encoding.
pub const ROLL_FIELD_BITS: u32 = 3;

/// Mask for one side-count field.
pub const ROLL_FIELD_MASK: u32 = (1 << ROLL_FIELD_BITS) - 1;

/// One past the largest valid roll encoding (five sixes = 5 << 15).
pub const MAX_ROLL: usize = (5 << (ROLL_FIELD_BITS * 5)) + 1;

/// Number of distinct multisets of 0..=5 dice: 1+6+21+56+126+252.
pub const NUM_VALID_ROLLS: usize = 462;

/// Number of distinct complete 5-die rolls: C(10, 5).
pub const NUM_COMPLETE_ROLLS: usize = 252;

/// Number of scoring categories.
pub const NUM_CATEGORIES: usize = 13;

pub const CATEGORY_ONES: usize = 0;
pub const CATEGORY_TWOS: usize = 1;
pub const CATEGORY_THREES: usize = 2;
pub const CATEGORY_FOURS: usize = 3;
pub const CATEGORY_FIVES: usize = 4;
pub const CATEGORY_SIXES: usize = 5;
pub const CATEGORY_THREE_OF_A_KIND: usize = 6;
pub const CATEGORY_FOUR_OF_A_KIND: usize = 7;
pub const CATEGORY_FULL_HOUSE: usize = 8;
pub const CATEGORY_SMALL_STRAIGHT: usize = 9;
pub const CATEGORY_LARGE_STRAIGHT: usize = 10;
pub const CATEGORY_CHANCE: usize = 11;
pub const CATEGORY_YAHTZEE: usize = 12;

/// Human-readable category names.
pub const CATEGORY_NAMES: [&str; NUM_CATEGORIES] = [
    "Ones",
    "Twos",
    "Threes",
    "Fours",
    "Fives",
    "Sixes",
    "Three of a Kind",
    "Four of a Kind",
    "Full House",
    "Small Straight",
    "Large Straight",
    "Chance",
    "Yahtzee",
];

/// Bit position of the Yahtzee-bonus eligibility flag.
pub const BONUS_BIT: u32 = NUM_CATEGORIES as u32;

/// Shift of the capped upper-half sum field.
pub const UHS_SHIFT: u32 = BONUS_BIT + 1;

/// Mask covering the 13 filled-category bits.
pub const BOXES_MASK: u32 = (1 << NUM_CATEGORIES) - 1;

/// One past the largest game encoding: 64 upper-half values << UHS_SHIFT.
pub const MAX_GAME: usize = 64 << UHS_SHIFT;

/// Upper-half sum needed for the bonus; sums at or above are stored as 63.
pub const UPPER_BONUS_THRESHOLD: i32 = 63;

/// Upper-half bonus points.
pub const UPPER_BONUS: i32 = 35;

/// Bonus for each Yahtzee after the first scoring one.
pub const YAHTZEE_BONUS: i32 = 100;

/// Largest attainable game score; dense value vectors have MAX_SCORE + 1 slots.
pub const MAX_SCORE: usize = 1575;

#[inline(always)]
pub fn is_upper_half(category: usize) -> bool {
    category <= CATEGORY_SIXES
}
