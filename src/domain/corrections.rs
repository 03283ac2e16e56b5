//! Curated lookup tables for normalizing upstream chart data
//!
//! The chart is maintained by hand and spells the same maker or model in
//! several ways, and a handful of heatsinks carry wrong dimensions. These
//! tables are keyed by lowercased text and applied both to freshly crawled
//! records and to rows already in storage.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::cooler_record::CoolerRecord;

/// Lowercased maker spelling → canonical maker name
pub const MAKER_FIX: &[(&str, &str)] = &[
    ("3rsystem", "3Rsystem"),
    ("3rsystemm", "3Rsystem"),
    ("thermalright", "Thermalright"),
    ("thermalrightm", "Thermalright"),
    ("tunq", "Tuniq"),
    ("akasa", "Akasa"),
    ("intel", "Intel"),
    ("silverstone", "SilverStone"),
    ("coolage", "CoolAge"),
    ("corsair", "Corsair"),
    ("enermax", "Enermax"),
    ("thermolab", "ThermoLab"),
    ("xigmatek", "Xigmatek"),
    ("sunbeamtech", "Sunbeamtech"),
    ("scythe", "Scythe"),
    ("evercool", "Evercool"),
    ("deepcool", "Deepcool"),
    ("deep cool", "Deepcool"),
    ("cogage", "Cogage"),
    ("apack", "Apack"),
    ("zalman", "Zalman"),
    ("apachi", "Apachi"),
    ("gelid", "Gelid"),
];

/// Lowercased model spelling → canonical model name
pub const MODEL_FIX: &[(&str, &str)] = &[
    // 3Rsystem
    ("iceage 120", "iCEAGE 120"),
    ("iceage 120 boss", "iCEAGE 120 BOSS"),
    ("iceage 120 prima", "iCEAGE 120 PRIMA"),
    ("iceage 90mm", "iCEAGE 90mm"),
    // AMD
    ("amd정품", "AMD 정품"),
    // ASUS
    ("triton 79 amazing", "TRITON 79 AMAZING"),
    // CoolerMaster
    ("geminll (풍신장)∩", "Gemin II ∩"),
    ("geminll (풍신장)∪", "Gemin II ∪"),
    // Corsair
    ("hydro series h50", "H50"),
    // SilverStone
    ("sst-he01", "Heligon HE01"),
    ("he-02", "Heligon HE02"),
    ("ar01", "Argon AR01"),
    ("ar03", "Argon AR03"),
    ("td02", "Tundra TD02"),
    ("td03", "Tundra TD03"),
    // Sunbeamtech
    ("core_contact freezer 92", "Core-Contact Freezer 92"),
    // Thermalright
    ("silverarrow sb-e", "Silver Arrow SB-E"),
    ("true spirit", "True Spirit"),
    ("ultra 120", "Ultra-120"),
    ("ultra 120 extreme", "Ultra-120 eXtreme"),
    // Thermaltake
    ("bigtyp 14pro(cl-p0456)", "BigTyp 14Pro CL-P0456"),
    // ThermoLab
    ("baram(바람)", "BARAM"),
    ("baram shine(바람 샤인)", "BARAM Shine"),
    ("baram 2010", "BARAM2010"),
    // Xigmatek
    ("dark knight-s1283", "Dark Knight S1283"),
    // Zalman
    ("cnps9700nt", "CNPS9700 NT"),
    ("cnps9900led", "CNPS9900 LED"),
];

/// Dimension overrides for heatsinks whose published size is known to be wrong
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DimensionFix {
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub height: Option<f64>,
}

impl DimensionFix {
    const fn new(width: Option<f64>, depth: Option<f64>, height: Option<f64>) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    /// Overwrite the given dimensions with every value this fix carries
    pub fn apply(
        &self,
        width: &mut Option<f64>,
        depth: &mut Option<f64>,
        height: &mut Option<f64>,
    ) {
        if let Some(w) = self.width {
            *width = Some(w);
        }
        if let Some(d) = self.depth {
            *depth = Some(d);
        }
        if let Some(h) = self.height {
            *height = Some(h);
        }
    }
}

/// Lowercased `"maker model"` → dimension override
pub const INCONSISTENCY_FIX: &[(&str, DimensionFix)] = &[
    ("3rsystem iceage 120", DimensionFix::new(Some(125.0), Some(100.0), Some(154.0))),
    ("asus silent square", DimensionFix::new(Some(140.0), None, None)),
    ("asus triton 75", DimensionFix::new(None, None, Some(115.0))),
    ("thermolab baram shine", DimensionFix::new(Some(132.0), Some(67.0), None)),
    ("coolermaster gemin ii ∪", DimensionFix::new(None, Some(124.0), None)),
    ("thermalright ultra-120", DimensionFix::new(None, None, Some(160.5))),
];

/// Lowercased `"maker model"` → Danawa product id
pub const DANAWA_ID: &[(&str, i64)] = &[
    ("corsair h100", 1465177),
    ("corsair h100i", 1896659),
    ("corsair h110", 2054714),
    ("corsair h40", 1591684),
    ("corsair h55", 1875650),
    ("corsair h60", 1340330),
    ("corsair new h60", 1884431),
    ("corsair h70", 1230305),
    ("corsair h80", 1443537),
    ("corsair h80i", 1896626),
    ("corsair h90", 2048037),
    ("corsair h50", 956488),
    ("thermalright hr-02 macho", 1764303),
    ("thermalright true spirit 140", 1536172),
    ("thermalright venomous x", 1764275),
    ("thermaltake big typhoon vx", 512185),
    ("thermaltake bigtyp 14pro cl-p0456", 803304),
    ("thermaltake water 2.0 extreme", 1975137),
    ("tuniq tower 120 extreme", 930715),
    ("xigmatek colosseum sm128164", 1363703),
    ("xigmatek loki sd963", 1363843),
    ("zalman cnps10x extreme", 901173),
    ("zalman cnps10x flex", 960357),
    ("zalman cnps10x optima", 1609054),
    ("zalman cnps10x performa", 1014974),
    ("zalman cnps10x quiet", 922018),
    ("zalman cnps11x performa", 1537168),
    ("zalman cnps11x", 1331101),
    ("zalman cnps12x", 1504781),
    ("zalman cnps20lq", 1573512),
    ("zalman cnps7700-cu", 43991),
    ("zalman cnps7x performa", 1350566),
    ("zalman cnps8000", 1546329),
    ("zalman cnps8700 led", 498981),
    ("zalman cnps9500 led", 586840),
    ("zalman cnps9700 led", 284022),
    ("zalman cnps9700 nt", 365992),
    ("zalman cnps9900 led", 930562),
    ("zalman cnps9900 max", 1206375),
    ("zalman cnps9900 nt", 930574),
    ("zalman reserator 3 max", 2188540),
    ("zalman zm-lq310", 1801121),
    ("zalman zm-lq315", 1801146),
    ("zalman zm-lq320", 1915454),
    ("zerotherm zt-10d premium 듀얼", 1166298),
    ("zerotherm zt-10d smart", 1266012),
    ("3rsystem iceage 120", 451918),
    ("3rsystem iceage 120 boss", 669681),
    ("3rsystem iceage 120 prima", 617634),
    ("3rsystem iceage 120 prima boss 2", 883448),
    ("3rsystem iceage 120 prima boss 2 hq", 995037),
    ("3rsystem iceage 90mm", 451922),
    ("apack cf800", 904056),
    ("apack core 92", 914793),
    ("apack nirvana nv120", 904058),
    ("apack nirvana nv120 premium", 573361),
    ("apack zerotherm fz120", 658661),
    ("asus lion square", 663980),
    ("asus silent square", 672687),
    ("asus triton 75", 837094),
    ("asus triton 79 amazing", 672680),
    ("akasa venom voodoo", 1520426),
    ("antec kühler h2o 620", 1318779),
    ("antec kühler h2o 920", 1341846),
    ("coolage ca-x120tf", 924154),
    ("coolit eco", 1055287),
    ("coolit vantage", 1166532),
    ("coolage 924 hdc", 737788),
    ("coolage 924 hdc plus", 1009082),
    ("coolermaster gemin ii ∩", 838212),
    ("coolermaster gemin ii ∪", 838212),
    ("coolermaster hyper 103", 2123386),
    ("coolermaster hyper 212 plus", 932592),
    ("coolermaster hyper 612 pwm", 1504783),
    ("coolermaster hyper 612s", 1485847),
    ("coolermaster hyper tx3", 1441296),
    ("coolermaster hyper z600", 838263),
    ("coolermaster hyper n620", 933669),
    ("coolermaster seidon 120m", 1885320),
    ("coolermaster seidon 120v", 2181109),
    ("coolermaster seidon 120xl", 1925602),
    ("coolermaster seidon 240m", 1925660),
    ("coolermaster tpc 812", 1921248),
    ("coolermaster v10", 1443541),
    ("coolermaster v6 gt", 1441266),
    ("coolermaster v8", 1443542),
    ("coolermaster vortex plus", 1441317),
    ("deepcool gamer storm assassin", 1867582),
    ("deepcool gammaxx 300", 1917527),
    ("deepcool gammaxx 400", 1917537),
    ("deepcool gammaxx s40", 2066742),
    ("deepcool ice blade pro", 1917551),
    ("deepcool neptwin", 1895632),
    ("enermax etd-t60", 1534157),
    ("enermax ets-t40-ta", 1467480),
    ("evercool hph-9525ea", 641739),
    ("evercool transformer 3", 1405997),
    ("gelid tranquillo", 1008427),
    ("intel rts2011lc liquid", 1579706),
    ("prolimatech megahalems rev.b", 954649),
    ("prolimatech super mega", 1238453),
    ("scythe orochi", 662047),
    ("silverstone argon ar01", 2049333),
    ("silverstone argon ar03", 2049376),
    ("silverstone heligon he02", 1888564),
    ("thermalright axp-140", 1324140),
    ("tuniq tower 120", 220390),
    ("silverstone heligon he01", 1836706),
    ("sunbeamtech core-contact freezer", 702120),
    ("sunbeamtech core-contact freezer 92", 910357),
    ("thermalright si-128", 363593),
    ("thermalright silver arrow sb-e", 1631443),
    ("thermalright ultima-90", 557455),
    ("thermalright ultra-120", 159794),
    ("thermalright ultra-120 extreme", 482195),
    ("thermolab bada", 932455),
    ("thermolab bada2010", 1021471),
    ("thermolab baram", 794508),
    ("thermolab baram2010", 1043344),
    ("thermolab baram shine", 962797),
    ("thermolab micro silencer", 639789),
    ("thermolab nano silencer", 820202),
    ("thermolab trinity", 1298177),
    ("xigmatek dark knight s1283", 1959996),
    ("zerotherm zt-10d smart 듀얼", 1266012),
    ("zalman cnps7000b-alcu", 43986),
    ("zalman cnps7000b-cu", 43987),
    ("청남아이티 hurricane", 967812),
    ("deepcool gamer storm lucifer", 2220113),
    ("xigmatek hdt-s1283", 576667),
];

static MAKER_FIX_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| MAKER_FIX.iter().copied().collect());
static MODEL_FIX_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| MODEL_FIX.iter().copied().collect());
static INCONSISTENCY_FIX_MAP: Lazy<HashMap<&'static str, DimensionFix>> =
    Lazy::new(|| INCONSISTENCY_FIX.iter().copied().collect());
static DANAWA_ID_MAP: Lazy<HashMap<&'static str, i64>> =
    Lazy::new(|| DANAWA_ID.iter().copied().collect());

/// Canonical spelling of a maker, if the lowercased name is a known variant
pub fn canonical_maker(name: &str) -> Option<&'static str> {
    MAKER_FIX_MAP.get(name.to_lowercase().as_str()).copied()
}

/// Canonical spelling of a model, if the lowercased name is a known variant
pub fn canonical_model(name: &str) -> Option<&'static str> {
    MODEL_FIX_MAP.get(name.to_lowercase().as_str()).copied()
}

/// Dimension override for a lowercased `"maker model"` key
pub fn dimension_fix(key: &str) -> Option<DimensionFix> {
    INCONSISTENCY_FIX_MAP.get(key).copied()
}

/// Danawa product id for a lowercased `"maker model"` key
pub fn danawa_id(key: &str) -> Option<i64> {
    DANAWA_ID_MAP.get(key).copied()
}

/// Apply the dimension override for this record's heatsink, if there is one
pub fn correct_record(record: &mut CoolerRecord) -> bool {
    match dimension_fix(&record.lookup_key()) {
        Some(fix) => {
            fix.apply(&mut record.width, &mut record.depth, &mut record.height);
            true
        }
        None => false,
    }
}
