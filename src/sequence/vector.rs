use crate::error::SequenceError;

/// Number of columns in one record: the command plus sixteen arguments.
pub const RECORD_WIDTH: usize = 17;

/// Value carried by unused arguments and by padding records.
pub const PAD_VALUE: f64 = -1.0;

/// Column index of the command discriminant.
pub const COL_CMD: usize = 0;
pub const COL_X: usize = 1;
pub const COL_Y: usize = 2;
pub const COL_ALPHA: usize = 3;
pub const COL_FLAG: usize = 4;
pub const COL_RADIUS: usize = 5;
pub const COL_THETA: usize = 6;
pub const COL_PHI: usize = 7;
pub const COL_GAMMA: usize = 8;
pub const COL_PX: usize = 9;
pub const COL_PY: usize = 10;
pub const COL_PZ: usize = 11;
pub const COL_SCALE: usize = 12;
pub const COL_E1: usize = 13;
pub const COL_E2: usize = 14;
pub const COL_BOOLEAN: usize = 15;
pub const COL_EXTENT_TYPE: usize = 16;

/// Human-readable argument names, indexed by column.
pub const COLUMN_NAMES: [&str; RECORD_WIDTH] = [
    "cmd", "x", "y", "alpha", "f", "r", "theta", "phi", "gamma", "px", "py", "pz", "s", "e1",
    "e2", "b", "u",
];

/// A single record of the vector.
pub type Record = [f64; RECORD_WIDTH];

/// Command discriminant of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Line,
    Arc,
    Circle,
    Eos,
    Sol,
    Ext,
}

impl Command {
    /// All commands in discriminant order.
    pub const ALL: [Self; 6] = [
        Self::Line,
        Self::Arc,
        Self::Circle,
        Self::Eos,
        Self::Sol,
        Self::Ext,
    ];

    /// Parses a raw column value. The value must be within `1e-6` of an
    /// integer discriminant.
    #[must_use]
    pub fn from_value(value: f64) -> Option<Self> {
        let index = discrete(value)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Integer discriminant as stored in the vector.
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Self::Line => 0.0,
            Self::Arc => 1.0,
            Self::Circle => 2.0,
            Self::Eos => 3.0,
            Self::Sol => 4.0,
            Self::Ext => 5.0,
        }
    }

    /// Display name used in diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Line => "Line",
            Self::Arc => "Arc",
            Self::Circle => "Circle",
            Self::Eos => "EOS",
            Self::Sol => "SOL",
            Self::Ext => "Ext",
        }
    }

    /// Argument columns this command uses.
    #[must_use]
    pub fn arguments(self) -> &'static [usize] {
        match self {
            Self::Line => &[COL_X, COL_Y],
            Self::Arc => &[COL_X, COL_Y, COL_ALPHA, COL_FLAG],
            Self::Circle => &[COL_X, COL_Y, COL_RADIUS],
            Self::Eos | Self::Sol => &[],
            Self::Ext => &[
                COL_THETA,
                COL_PHI,
                COL_GAMMA,
                COL_PX,
                COL_PY,
                COL_PZ,
                COL_SCALE,
                COL_E1,
                COL_E2,
                COL_BOOLEAN,
                COL_EXTENT_TYPE,
            ],
        }
    }
}

/// Rounds `value` to an integer if it lies within `1e-6` of one.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn discrete(value: f64) -> Option<i64> {
    let rounded = value.round();
    if value.is_finite() && (value - rounded).abs() < 1e-6 && rounded.abs() < 1e15 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Returns a record with every column set to the pad value.
#[must_use]
pub fn pad_record() -> Record {
    [PAD_VALUE; RECORD_WIDTH]
}

/// Returns a record for `command` with every argument padded.
#[must_use]
pub fn command_record(command: Command) -> Record {
    let mut record = pad_record();
    record[COL_CMD] = command.value();
    record
}

/// Whether a record is a padding record (command equal to the pad value).
#[must_use]
pub fn is_padding(record: &Record) -> bool {
    discrete(record[COL_CMD]) == Some(-1)
}

/// A CAD sequence vector: ordered fixed-width numeric records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CadSequenceVector {
    records: Vec<Record>,
}

impl CadSequenceVector {
    /// Creates a vector from records.
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Builds a vector from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::RaggedVector`] if the length is not a
    /// multiple of [`RECORD_WIDTH`].
    pub fn from_flat(values: &[f64]) -> Result<Self, SequenceError> {
        if values.len() % RECORD_WIDTH != 0 {
            return Err(SequenceError::RaggedVector {
                len: values.len(),
                width: RECORD_WIDTH,
            });
        }
        let records = values
            .chunks_exact(RECORD_WIDTH)
            .map(|chunk| {
                let mut record = pad_record();
                record.copy_from_slice(chunk);
                record
            })
            .collect();
        Ok(Self { records })
    }

    /// Flattens the records row-major.
    #[must_use]
    pub fn to_flat(&self) -> Vec<f64> {
        self.records.iter().flatten().copied().collect()
    }

    /// Returns the records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records, padding included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that carry meaning: padding skipped, stopping before the
    /// first EOS.
    pub fn meaningful(&self) -> impl Iterator<Item = (usize, &Record)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| !is_padding(r))
            .take_while(|(_, r)| Command::from_value(r[COL_CMD]) != Some(Command::Eos))
    }

    /// Returns a copy extended with EOS records up to `len` records.
    /// Longer vectors are returned unchanged.
    #[must_use]
    pub fn padded(&self, len: usize) -> Self {
        let mut records = self.records.clone();
        while records.len() < len {
            records.push(command_record(Command::Eos));
        }
        Self { records }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn command_parsing_requires_integer_values() {
        assert_eq!(Command::from_value(4.0), Some(Command::Sol));
        assert_eq!(Command::from_value(5.0000001), Some(Command::Ext));
        assert_eq!(Command::from_value(2.5), None);
        assert_eq!(Command::from_value(6.0), None);
        assert_eq!(Command::from_value(-1.0), None);
        assert_eq!(Command::from_value(f64::NAN), None);
    }

    #[test]
    fn ragged_flat_buffer_is_rejected() {
        let err = CadSequenceVector::from_flat(&[0.0; RECORD_WIDTH + 3]).unwrap_err();
        assert!(matches!(err, SequenceError::RaggedVector { len: 20, width: 17 }));
    }

    #[test]
    fn meaningful_skips_padding_and_stops_at_eos() {
        let v = CadSequenceVector::new(vec![
            pad_record(),
            command_record(Command::Sol),
            command_record(Command::Eos),
            command_record(Command::Sol),
        ]);
        let idx: Vec<usize> = v.meaningful().map(|(i, _)| i).collect();
        assert_eq!(idx, vec![1]);
    }

    #[test]
    fn padded_appends_eos() {
        let v = CadSequenceVector::new(vec![command_record(Command::Sol)]).padded(3);
        assert_eq!(v.len(), 3);
        assert_eq!(v.records()[2][COL_CMD], 3.0);
        assert_eq!(v.to_flat().len(), 3 * RECORD_WIDTH);
    }
}
