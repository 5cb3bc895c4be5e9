use core::{fmt, str::FromStr};

const DECIMAL: &[u8; 10] = b"0123456789";
const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Filler used to left-pad identifiers shorter than the requested width.
///
/// Both alphabets map digit zero to `'0'`, so padding and encoding agree.
pub const PAD: u8 = b'0';

/// Fixed-radix alphabet used to render an index as an identifier.
///
/// The encoding is positional: the rightmost character is the least
/// significant digit and missing high digits are [`PAD`]. Over a fixed width
/// `w` the mapping is injective for every index below `radix^w`; larger
/// indices keep only their low-order `w` digits and therefore collide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alphabet {
    /// `0-9`.
    #[default]
    Decimal,
    /// `0-9A-Za-z`.
    Base62,
}

impl Alphabet {
    pub const fn symbols(self) -> &'static [u8] {
        match self {
            Self::Decimal => DECIMAL,
            Self::Base62 => BASE62,
        }
    }

    pub const fn radix(self) -> u64 {
        self.symbols().len() as u64
    }

    /// Writes `index` into `buf`, using the full slice as the identifier
    /// width.
    ///
    /// Digits are produced from the right. Once `index` is exhausted the
    /// remaining slots receive the zero symbol, which doubles as padding. If
    /// `index` has more digits than `buf` holds, the high digits are dropped.
    #[inline]
    pub fn encode_into(self, index: u64, buf: &mut [u8]) {
        let symbols = self.symbols();
        let radix = self.radix();
        let mut rest = index;
        for slot in buf.iter_mut().rev() {
            // `rest % radix` is always below `symbols.len()`.
            *slot = symbols[(rest % radix) as usize];
            rest /= radix;
        }
    }

    /// Encodes `index` as a string of exactly `length` characters.
    pub fn encode(self, index: u64, length: usize) -> String {
        let mut buf = vec![PAD; length];
        self.encode_into(index, &mut buf);

        // SAFETY: both alphabets are pure ASCII
        unsafe { String::from_utf8_unchecked(buf) }
    }

    /// Smallest width `n >= 1` such that `count < radix^n`.
    ///
    /// Every index in `0..count` is then distinct under [`Self::encode`]. The
    /// rule is deliberately conservative at exact powers of the radix
    /// (decimal `count = 10` needs 2 even though `0..10` fits in one digit).
    pub fn min_length_for_uniqueness(self, count: u64) -> usize {
        let radix = u128::from(self.radix());
        let count = u128::from(count);
        let mut width = 1;
        let mut capacity = radix;
        while count >= capacity {
            capacity *= radix;
            width += 1;
        }
        width
    }

    /// Whether identifiers of `length` characters stay unique over
    /// `0..count`.
    pub fn is_length_sufficient(self, count: u64, length: usize) -> bool {
        length >= self.min_length_for_uniqueness(count)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal => write!(f, "decimal"),
            Self::Base62 => write!(f, "base62"),
        }
    }
}

impl FromStr for Alphabet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "decimal" | "dec" | "10" => Ok(Self::Decimal),
            "base62" | "62" => Ok(Self::Base62),
            other => Err(format!("unknown alphabet `{other}` (expected decimal|base62)")),
        }
    }
}
