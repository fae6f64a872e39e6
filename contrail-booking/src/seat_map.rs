use contrail_core::error::{BookingError, BookingResult};
use contrail_core::flight::{SeatClass, SeatPool, MAX_SEAT_COLUMNS};
use std::fmt;

/// A physical seat such as `12C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeatCode {
    pub row: i32,
    pub column: char,
}

impl SeatCode {
    /// Parses `<row><letter>`, case-insensitive, surrounding whitespace ignored.
    pub fn parse(raw: &str) -> BookingResult<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let invalid = |reason: &str| BookingError::InvalidSeatCode {
            code: raw.to_string(),
            reason: reason.to_string(),
        };

        let column = code.chars().last().ok_or_else(|| invalid("empty seat code"))?;
        if !column.is_ascii_uppercase() {
            return Err(invalid("must end with a column letter"));
        }

        let digits = &code[..code.len() - 1];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must start with a row number"));
        }
        let row: i32 = digits.parse().map_err(|_| invalid("row number out of range"))?;
        if row < 1 {
            return Err(invalid("rows start at 1"));
        }

        Ok(SeatCode { row, column })
    }

    /// Zero-based column index, `A` = 0.
    pub fn column_index(&self) -> i32 {
        (self.column as u8 - b'A') as i32
    }
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cabin {
    class: SeatClass,
    first_row: i32,
    last_row: i32,
    max_col: i32,
}

/// Layout of a flight's cabins.
///
/// Rows are numbered from 1 across the whole aircraft, first class at the
/// front, then business, then economy. A cabin with zero rows or columns
/// has no seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMap {
    cabins: Vec<Cabin>,
}

impl SeatMap {
    pub fn from_pools(pools: &[SeatPool]) -> Self {
        let mut sorted: Vec<&SeatPool> = pools.iter().collect();
        sorted.sort_by_key(|p| p.class);

        let mut next_row = 1;
        let mut cabins = Vec::with_capacity(sorted.len());
        for pool in sorted {
            if pool.max_row <= 0 || pool.max_col <= 0 {
                continue;
            }
            cabins.push(Cabin {
                class: pool.class,
                first_row: next_row,
                last_row: next_row.saturating_add(pool.max_row - 1),
                max_col: pool.max_col.min(MAX_SEAT_COLUMNS),
            });
            next_row = next_row.saturating_add(pool.max_row);
        }

        SeatMap { cabins }
    }

    pub fn class_of(&self, seat: SeatCode) -> Option<SeatClass> {
        self.cabins
            .iter()
            .find(|c| seat.row >= c.first_row && seat.row <= c.last_row)
            .filter(|c| seat.column_index() < c.max_col)
            .map(|c| c.class)
    }

    /// Validates a raw seat code against the cabin of `class` and returns
    /// its canonical form.
    pub fn check(&self, raw: &str, class: SeatClass) -> BookingResult<String> {
        let seat = SeatCode::parse(raw)?;
        match self.class_of(seat) {
            Some(found) if found == class => Ok(seat.to_string()),
            Some(found) => Err(BookingError::InvalidSeatCode {
                code: raw.to_string(),
                reason: format!("seat is in the {} cabin, ticket is {}", found, class),
            }),
            None => Err(BookingError::InvalidSeatCode {
                code: raw.to_string(),
                reason: "no such seat on this aircraft".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrail_core::money::Multiplier;
    use uuid::Uuid;

    fn pool(class: SeatClass, max_row: i32, max_col: i32) -> SeatPool {
        SeatPool {
            flight_id: Uuid::nil(),
            class,
            class_multiplier: Multiplier::ONE,
            child_multiplier: Multiplier::DEFAULT_CHILD,
            max_row,
            max_col,
            occupied: 0,
        }
    }

    fn map() -> SeatMap {
        SeatMap::from_pools(&[
            pool(SeatClass::Economy, 20, 6),
            pool(SeatClass::First, 2, 4),
            pool(SeatClass::Business, 3, 4),
        ])
    }

    #[test]
    fn test_parse() {
        assert_eq!(SeatCode::parse(" 12c ").unwrap(), SeatCode { row: 12, column: 'C' });
        assert!(SeatCode::parse("").is_err());
        assert!(SeatCode::parse("C12").is_err());
        assert!(SeatCode::parse("0A").is_err());
        assert!(SeatCode::parse("1-A").is_err());
        assert!(SeatCode::parse("1Ä").is_err());
    }

    #[test]
    fn test_rows_run_front_to_back() {
        let map = map();
        assert_eq!(map.class_of(SeatCode::parse("1A").unwrap()), Some(SeatClass::First));
        assert_eq!(map.class_of(SeatCode::parse("3D").unwrap()), Some(SeatClass::Business));
        assert_eq!(map.class_of(SeatCode::parse("6A").unwrap()), Some(SeatClass::Economy));
        assert_eq!(map.class_of(SeatCode::parse("25F").unwrap()), Some(SeatClass::Economy));
        assert_eq!(map.class_of(SeatCode::parse("26A").unwrap()), None);
        // Business is only four abreast.
        assert_eq!(map.class_of(SeatCode::parse("3E").unwrap()), None);
    }

    #[test]
    fn test_check_enforces_cabin() {
        let map = map();
        assert_eq!(map.check("7b", SeatClass::Economy).unwrap(), "7B");
        let err = map.check("1A", SeatClass::Economy).unwrap_err();
        assert!(matches!(err, BookingError::InvalidSeatCode { .. }));
    }
}
