//! Per-source vocabulary tables
//!
//! Every table is a single-pass lookup keyed on the trimmed original raw
//! value (ASCII case-insensitive). A mapped value is never fed back into
//! another table.

use crate::ingestion::types::{RegionalSpecs, SellerType};

/// Raw label -> canonical category, with a fallback for unmapped labels
pub struct CategoryTable<T: Copy + 'static> {
    entries: &'static [(&'static str, T)],
    unmapped: T,
    missing: T,
}

impl<T: Copy + 'static> CategoryTable<T> {
    pub const fn new(entries: &'static [(&'static str, T)], unmapped: T, missing: T) -> Self {
        Self {
            entries,
            unmapped,
            missing,
        }
    }

    pub fn lookup(&self, raw: &str) -> Option<T> {
        let raw = raw.trim();
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(raw))
            .map(|(_, value)| *value)
    }

    pub fn map(&self, raw: Option<&str>) -> T {
        match raw.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => self.lookup(raw).unwrap_or(self.unmapped),
            None => self.missing,
        }
    }
}

/// Raw label -> replacement label; unmapped labels pass through unchanged
pub struct RenameTable {
    entries: &'static [(&'static str, &'static str)],
}

impl RenameTable {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn apply(&self, raw: &str) -> String {
        let raw = raw.trim();
        self.entries
            .iter()
            .find(|(key, _)| *key == raw)
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| raw.to_string())
    }
}

use RegionalSpecs::{American, Canadian, Chinese, European, Gcc, Japanese, Korean, Other};

const SPECS_UNKNOWN: RegionalSpecs = RegionalSpecs::Unknown;

pub static DUBIZZLE_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("GCC Specs", Gcc),
        ("American Specs", American),
        ("European Specs", European),
        ("Japanese Specs", Japanese),
        ("Canadian Specs", Canadian),
        ("Korean Specs", Korean),
        ("Chinese Specs", Chinese),
        ("Other", Other),
        ("Unknown", SPECS_UNKNOWN),
    ],
    Other,
    SPECS_UNKNOWN,
);

pub static DUBICARS_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("GCC", Gcc),
        ("American", American),
        ("US", American),
        ("European", European),
        ("Japanese", Japanese),
        ("Canadian", Canadian),
        ("Korean", Korean),
        ("Chinese", Chinese),
        ("Other", Other),
    ],
    SPECS_UNKNOWN,
    SPECS_UNKNOWN,
);

pub static CARSWITCH_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("GCC", Gcc),
        ("GCC Specs", Gcc),
        ("American", American),
        ("America Specs", American),
        ("American Specs", American),
        ("Canadian", Canadian),
        ("Canadia Specs", Canadian),
        ("Canadian Specs", Canadian),
        ("European", European),
        ("Europea Specs", European),
        ("European Specs", European),
        ("Japan", Japanese),
        ("Japan Specs", Japanese),
        ("Japanese Specs", Japanese),
        ("Korean Specs", Korean),
        ("Chinese Specs", Chinese),
        ("Non GCC", Other),
        ("Non GCC Specs", Other),
        ("Other", Other),
    ],
    SPECS_UNKNOWN,
    SPECS_UNKNOWN,
);

pub static CARS24_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("GCC", Gcc),
        ("NON_GCC", Other),
        ("NON GCC", Other),
        ("Non GCC", Other),
    ],
    SPECS_UNKNOWN,
    SPECS_UNKNOWN,
);

pub static TELEGRAM_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("GCC", Gcc),
        ("GCCEdition", Gcc),
        ("GCC Edition", Gcc),
        ("MiddleEast", Gcc),
        ("MidEast", Gcc),
        ("Domesticversion", Gcc),
        ("American", American),
        ("US", American),
        ("US-spec", American),
        ("USSpec", American),
        ("NorthAmerican", American),
        ("NorthAmerica", American),
        ("Canadian", Canadian),
        ("Notprovided", SPECS_UNKNOWN),
        ("RightFrontDamaged", SPECS_UNKNOWN),
        ("FullOption", SPECS_UNKNOWN),
        ("Overseasversion", SPECS_UNKNOWN),
    ],
    SPECS_UNKNOWN,
    SPECS_UNKNOWN,
);

pub static MARHABA_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("GCC", Gcc),
        ("American", American),
        ("USA", American),
        ("European", European),
        ("Europe", European),
        ("Japanese", Japanese),
        ("Japan", Japanese),
        ("Canadian", Canadian),
        ("Korean", Korean),
        ("Chinese", Chinese),
        ("Other", Other),
    ],
    SPECS_UNKNOWN,
    SPECS_UNKNOWN,
);

/// Emirates Auction reports the country of manufacture
pub static EMIRATES_COUNTRY_SPECS: CategoryTable<RegionalSpecs> = CategoryTable::new(
    &[
        ("United Arab Emirates", Gcc),
        ("United States", American),
        ("Canada", Canadian),
        ("Japan", Japanese),
        ("South Korea", Korean),
        ("China mainland", Chinese),
        ("China", Chinese),
        ("Germany", European),
        ("Sweden", European),
        ("United Kingdom", European),
        ("Spain", European),
        ("Italy", European),
        ("Belgium", European),
        ("Portugal", European),
        ("Netherlands", European),
        ("Slovakia", European),
        ("Hungary", European),
        ("France", European),
        ("Austria", European),
        ("Romania", European),
        ("Thailand", Other),
        ("South Africa", Other),
        ("Australia", Other),
        ("Mexico", Other),
        ("India", Other),
        ("Brazil", Other),
        ("Afghanistan", Other),
        ("Morocco", Other),
        ("Turkey", Other),
        ("Indonesia", Other),
        ("Taiwan", Other),
    ],
    Other,
    SPECS_UNKNOWN,
);

pub static DUBIZZLE_SELLER: CategoryTable<SellerType> = CategoryTable::new(
    &[
        ("Dealership/Certified Pre-Owned", SellerType::Dealer),
        ("Dealer", SellerType::Dealer),
        ("Owner", SellerType::Owner),
    ],
    SellerType::Unknown,
    SellerType::Unknown,
);

pub static DUBICARS_SELLER: CategoryTable<SellerType> = CategoryTable::new(
    &[
        ("Dealer", SellerType::Dealer),
        ("Private", SellerType::Owner),
    ],
    SellerType::Unknown,
    SellerType::Unknown,
);

pub static CARS24_SELLER: CategoryTable<SellerType> = CategoryTable::new(
    &[
        ("PRIME", SellerType::Dealer),
        ("LITE", SellerType::Dealer),
        ("PRIVATE_SELLER", SellerType::Owner),
        ("PRIVATE_SELLER_PRO", SellerType::Owner),
    ],
    SellerType::Unknown,
    SellerType::Unknown,
);

pub static DUBICARS_BODY: RenameTable = RenameTable::new(&[
    ("SUV/Crossover", "SUV"),
    ("Truck", "Utility Truck"),
    ("Station Wagon", "Wagon"),
]);

pub static FUEL: RenameTable = RenameTable::new(&[("Gasoline", "Petrol")]);

pub static DUBICARS_SEATS: RenameTable = RenameTable::new(&[("9+", "8+")]);

pub static CARS24_COLOR: RenameTable = RenameTable::new(&[("Other", "Other Color")]);

/// Brand acronyms that title-casing mangles
pub static MAKE_ACRONYMS: RenameTable = RenameTable::new(&[
    ("Bmw", "BMW"),
    ("Gmc", "GMC"),
    ("Mg", "MG"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_specs_single_pass() {
        // Chained substitution turned "GCCEdition" into "GCC SpecsEdition"
        assert_eq!(TELEGRAM_SPECS.map(Some("GCCEdition")), Gcc);
        assert_eq!(TELEGRAM_SPECS.map(Some("gcc")), Gcc);
        assert_eq!(TELEGRAM_SPECS.map(Some("US-spec")), American);
        assert_eq!(TELEGRAM_SPECS.map(Some("NorthAmerican")), American);
        assert_eq!(TELEGRAM_SPECS.map(Some("Overseasversion")), SPECS_UNKNOWN);
        assert_eq!(TELEGRAM_SPECS.map(None), SPECS_UNKNOWN);
    }

    #[test]
    fn test_carswitch_specs_misspellings() {
        assert_eq!(CARSWITCH_SPECS.map(Some("America Specs")), American);
        assert_eq!(CARSWITCH_SPECS.map(Some("Canadia Specs")), Canadian);
        assert_eq!(CARSWITCH_SPECS.map(Some("Japan Specs")), Japanese);
        assert_eq!(CARSWITCH_SPECS.map(Some("Non GCC Specs")), Other);
        assert_eq!(CARSWITCH_SPECS.map(Some("GCC")), Gcc);
        assert_eq!(CARSWITCH_SPECS.map(Some("Martian")), SPECS_UNKNOWN);
    }

    #[test]
    fn test_dubicars_tables() {
        assert_eq!(DUBICARS_SPECS.map(Some("Other")), Other);
        assert_eq!(DUBICARS_SPECS.map(Some("GCC")), Gcc);
        assert_eq!(DUBICARS_SELLER.map(Some("Private")), SellerType::Owner);
        assert_eq!(DUBICARS_BODY.apply("SUV/Crossover"), "SUV");
        assert_eq!(DUBICARS_BODY.apply("Truck"), "Utility Truck");
        assert_eq!(DUBICARS_BODY.apply("Sedan"), "Sedan");
        assert_eq!(FUEL.apply("Gasoline"), "Petrol");
        assert_eq!(DUBICARS_SEATS.apply("9+"), "8+");
    }

    #[test]
    fn test_emirates_country_specs() {
        assert_eq!(EMIRATES_COUNTRY_SPECS.map(Some("United Arab Emirates")), Gcc);
        assert_eq!(EMIRATES_COUNTRY_SPECS.map(Some("SOUTH KOREA")), Korean);
        assert_eq!(EMIRATES_COUNTRY_SPECS.map(Some("Germany")), European);
        assert_eq!(EMIRATES_COUNTRY_SPECS.map(Some("Kazakhstan")), Other);
        assert_eq!(EMIRATES_COUNTRY_SPECS.map(Some("")), SPECS_UNKNOWN);
    }

    #[test]
    fn test_seller_tables() {
        assert_eq!(
            DUBIZZLE_SELLER.map(Some("Dealership/Certified Pre-Owned")),
            SellerType::Dealer
        );
        assert_eq!(CARS24_SELLER.map(Some("PRIVATE_SELLER_PRO")), SellerType::Owner);
        assert_eq!(CARS24_SELLER.map(Some("LITE")), SellerType::Dealer);
        assert_eq!(CARS24_SELLER.map(Some("AUCTION")), SellerType::Unknown);
    }
}
