//! Sort modes, comparators and per-table sort state.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::filter::FileView;
use crate::report::DataBlock;

/// Sort modes offered by the FILES view.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileSortMode {
    NameDesc,
    NameAsc,
    SizeDesc,
    SizeAsc,
}

impl FileSortMode {
    /// Declaration order, also the order of the sort buttons.
    pub const ALL: [FileSortMode; 4] = [
        FileSortMode::NameDesc,
        FileSortMode::NameAsc,
        FileSortMode::SizeDesc,
        FileSortMode::SizeAsc,
    ];

    pub const DEFAULT: FileSortMode = FileSortMode::SizeDesc;

    pub fn label(self) -> &'static str {
        match self {
            FileSortMode::NameDesc => "Az↓",
            FileSortMode::NameAsc => "Az↑",
            FileSortMode::SizeDesc => "Estimated Size↓",
            FileSortMode::SizeAsc => "Estimated Size↑",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileSortMode::NameDesc => "name-desc",
            FileSortMode::NameAsc => "name-asc",
            FileSortMode::SizeDesc => "size-desc",
            FileSortMode::SizeAsc => "size-asc",
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            FileSortMode::NameDesc => FileSortMode::NameAsc,
            FileSortMode::NameAsc => FileSortMode::NameDesc,
            FileSortMode::SizeDesc => FileSortMode::SizeAsc,
            FileSortMode::SizeAsc => FileSortMode::SizeDesc,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Parse `value`, logging and substituting SIZE_DESC when it is not a mode.
    pub fn parse_or_default(value: &str) -> Self {
        Self::from_str(value).unwrap_or_else(|| {
            log::error!("Invalid sort mode: {}", value);
            Self::DEFAULT
        })
    }

    pub fn compare(self, a: &FileView<'_>, b: &FileView<'_>) -> Ordering {
        match self {
            FileSortMode::NameAsc => locale_cmp(a.name(), b.name()),
            FileSortMode::NameDesc => locale_cmp(b.name(), a.name()),
            FileSortMode::SizeAsc => a.size_bytes().cmp(&b.size_bytes()),
            FileSortMode::SizeDesc => b.size_bytes().cmp(&a.size_bytes()),
        }
    }
}

/// Column of a datablock table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SortField {
    Type,
    Name,
    Size,
    Percentage,
}

impl SortField {
    /// Table column order.
    pub const COLUMNS: [SortField; 4] = [
        SortField::Type,
        SortField::Name,
        SortField::Size,
        SortField::Percentage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortField::Type => "Type",
            SortField::Name => "Name",
            SortField::Size => "Estimated Size",
            SortField::Percentage => "Percentage",
        }
    }

    /// The field's modes, descending first.
    pub fn modes(self) -> [DatablockSortMode; 2] {
        match self {
            SortField::Name => [DatablockSortMode::NameDesc, DatablockSortMode::NameAsc],
            SortField::Type => [DatablockSortMode::TypeDesc, DatablockSortMode::TypeAsc],
            SortField::Size => [DatablockSortMode::SizeDesc, DatablockSortMode::SizeAsc],
            SortField::Percentage => [
                DatablockSortMode::PercentageDesc,
                DatablockSortMode::PercentageAsc,
            ],
        }
    }
}

/// Sort modes offered by datablock tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DatablockSortMode {
    NameDesc,
    NameAsc,
    TypeDesc,
    TypeAsc,
    SizeDesc,
    SizeAsc,
    PercentageDesc,
    PercentageAsc,
}

impl DatablockSortMode {
    pub const ALL: [DatablockSortMode; 8] = [
        DatablockSortMode::NameDesc,
        DatablockSortMode::NameAsc,
        DatablockSortMode::TypeDesc,
        DatablockSortMode::TypeAsc,
        DatablockSortMode::SizeDesc,
        DatablockSortMode::SizeAsc,
        DatablockSortMode::PercentageDesc,
        DatablockSortMode::PercentageAsc,
    ];

    pub const DEFAULT: DatablockSortMode = DatablockSortMode::PercentageDesc;

    pub fn label(self) -> &'static str {
        match self {
            DatablockSortMode::NameDesc => "Name↓",
            DatablockSortMode::NameAsc => "Name↑",
            DatablockSortMode::TypeDesc => "Type↓",
            DatablockSortMode::TypeAsc => "Type↑",
            DatablockSortMode::SizeDesc => "Estimated Size↓",
            DatablockSortMode::SizeAsc => "Estimated Size↑",
            DatablockSortMode::PercentageDesc => "Percentage↓",
            DatablockSortMode::PercentageAsc => "Percentage↑",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatablockSortMode::NameDesc => "name-desc",
            DatablockSortMode::NameAsc => "name-asc",
            DatablockSortMode::TypeDesc => "type-desc",
            DatablockSortMode::TypeAsc => "type-asc",
            DatablockSortMode::SizeDesc => "size-desc",
            DatablockSortMode::SizeAsc => "size-asc",
            DatablockSortMode::PercentageDesc => "percentage-desc",
            DatablockSortMode::PercentageAsc => "percentage-asc",
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            DatablockSortMode::NameDesc => DatablockSortMode::NameAsc,
            DatablockSortMode::NameAsc => DatablockSortMode::NameDesc,
            DatablockSortMode::TypeDesc => DatablockSortMode::TypeAsc,
            DatablockSortMode::TypeAsc => DatablockSortMode::TypeDesc,
            DatablockSortMode::SizeDesc => DatablockSortMode::SizeAsc,
            DatablockSortMode::SizeAsc => DatablockSortMode::SizeDesc,
            DatablockSortMode::PercentageDesc => DatablockSortMode::PercentageAsc,
            DatablockSortMode::PercentageAsc => DatablockSortMode::PercentageDesc,
        }
    }

    pub fn field(self) -> SortField {
        match self {
            DatablockSortMode::NameDesc | DatablockSortMode::NameAsc => SortField::Name,
            DatablockSortMode::TypeDesc | DatablockSortMode::TypeAsc => SortField::Type,
            DatablockSortMode::SizeDesc | DatablockSortMode::SizeAsc => SortField::Size,
            DatablockSortMode::PercentageDesc | DatablockSortMode::PercentageAsc => {
                SortField::Percentage
            }
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Parse `value`, logging and substituting PERCENTAGE_DESC when it is not a mode.
    pub fn parse_or_default(value: &str) -> Self {
        Self::from_str(value).unwrap_or_else(|| {
            log::error!("Invalid sort mode: {}", value);
            Self::DEFAULT
        })
    }

    /// Mode after clicking the header of `field`: the inverse when the table
    /// is already sorted by that field, else the field's descending mode.
    pub fn toggled(self, field: SortField) -> Self {
        if self.field() == field {
            self.inverse()
        } else {
            field.modes()[0]
        }
    }

    pub fn compare(self, a: &DataBlock, b: &DataBlock) -> Ordering {
        match self {
            DatablockSortMode::NameAsc => locale_cmp(&a.name, &b.name),
            DatablockSortMode::NameDesc => locale_cmp(&b.name, &a.name),
            DatablockSortMode::TypeAsc => locale_cmp(&a.kind, &b.kind),
            DatablockSortMode::TypeDesc => locale_cmp(&b.kind, &a.kind),
            DatablockSortMode::SizeAsc => a.size_bytes.cmp(&b.size_bytes),
            DatablockSortMode::SizeDesc => b.size_bytes.cmp(&a.size_bytes),
            DatablockSortMode::PercentageAsc => a.size_factor.total_cmp(&b.size_factor),
            DatablockSortMode::PercentageDesc => b.size_factor.total_cmp(&a.size_factor),
        }
    }
}

/// Human ordering for names: case and accent insensitive first, then
/// unaccented before accented, then lowercase before uppercase.
///
/// Accents are folded for Latin-1 and Latin Extended-A letters only; other
/// scripts and ligatures such as `ß` or `æ` compare by code point.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
        s.chars().flat_map(char::to_lowercase).map(fold_accent)
    }

    folded(a)
        .cmp(folded(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn fold_accent(c: char) -> char {
    match c {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        _ => c,
    }
}

/// Stable sort of files; ties keep their input order.
pub fn sort_files(files: &mut [FileView<'_>], mode: FileSortMode) {
    files.sort_by(|a, b| mode.compare(a, b));
}

/// Stable sort of datablocks; ties keep their input order.
pub fn sort_datablocks(blocks: &mut [&DataBlock], mode: DatablockSortMode) {
    blocks.sort_by(|a, b| mode.compare(a, b));
}

/// Identifies one datablock table.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TableKey {
    /// The table of one file in the FILES view.
    File(String),
    /// The single table of the DATABLOCKS view.
    AllDatablocks,
}

/// Sort mode of the FILES view plus one mode per datablock table.
#[derive(Clone, Debug)]
pub struct SortState {
    pub files: FileSortMode,
    table_default: DatablockSortMode,
    tables: HashMap<TableKey, DatablockSortMode>,
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(FileSortMode::DEFAULT, DatablockSortMode::DEFAULT)
    }
}

impl SortState {
    pub fn new(files: FileSortMode, table_default: DatablockSortMode) -> Self {
        Self {
            files,
            table_default,
            tables: HashMap::new(),
        }
    }

    /// Current mode of a table; tables never toggled use the default mode.
    pub fn table_mode(&self, key: &TableKey) -> DatablockSortMode {
        self.tables.get(key).copied().unwrap_or(self.table_default)
    }

    /// Apply a header click on `field` of table `key`, returning the new mode.
    pub fn toggle_table(&mut self, key: TableKey, field: SortField) -> DatablockSortMode {
        let mode = self.table_mode(&key).toggled(field);
        self.tables.insert(key, mode);
        mode
    }
}
