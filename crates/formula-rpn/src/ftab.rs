//! Built-in function table (`iftab` values used by `tFunc`/`tFuncVar`).
//!
//! Argument bounds are the ones Excel enforces for BIFF2-BIFF8 files. Variadic functions accept
//! at most 30 arguments in these formats.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Function id that `tFuncVar` uses for add-in and user-defined functions. The callee is passed
/// as the first argument.
pub const FTAB_USER_DEFINED: u16 = 255;

pub const FUNC_COUNT: u16 = 0;
pub const FUNC_IF: u16 = 1;
pub const FUNC_SUM: u16 = 4;
pub const FUNC_CHOOSE: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub id: u16,
    pub name: &'static str,
    pub min_args: u8,
    pub max_args: u8,
}

const fn spec(id: u16, name: &'static str, min_args: u8, max_args: u8) -> FunctionSpec {
    FunctionSpec {
        id,
        name,
        min_args,
        max_args,
    }
}

// Sorted by id; lookups binary search.
pub(crate) const FUNCTION_SPECS: &[FunctionSpec] = &[
    spec(0, "COUNT", 0, 30),
    spec(1, "IF", 2, 3),
    spec(2, "ISNA", 1, 1),
    spec(3, "ISERROR", 1, 1),
    spec(4, "SUM", 0, 30),
    spec(5, "AVERAGE", 1, 30),
    spec(6, "MIN", 1, 30),
    spec(7, "MAX", 1, 30),
    spec(8, "ROW", 0, 1),
    spec(9, "COLUMN", 0, 1),
    spec(10, "NA", 0, 0),
    spec(11, "NPV", 2, 30),
    spec(12, "STDEV", 1, 30),
    spec(13, "DOLLAR", 1, 2),
    spec(14, "FIXED", 2, 3),
    spec(15, "SIN", 1, 1),
    spec(16, "COS", 1, 1),
    spec(17, "TAN", 1, 1),
    spec(18, "ATAN", 1, 1),
    spec(19, "PI", 0, 0),
    spec(20, "SQRT", 1, 1),
    spec(21, "EXP", 1, 1),
    spec(22, "LN", 1, 1),
    spec(23, "LOG10", 1, 1),
    spec(24, "ABS", 1, 1),
    spec(25, "INT", 1, 1),
    spec(26, "SIGN", 1, 1),
    spec(27, "ROUND", 2, 2),
    spec(28, "LOOKUP", 2, 3),
    spec(29, "INDEX", 2, 4),
    spec(30, "REPT", 2, 2),
    spec(31, "MID", 3, 3),
    spec(32, "LEN", 1, 1),
    spec(33, "VALUE", 1, 1),
    spec(34, "TRUE", 0, 0),
    spec(35, "FALSE", 0, 0),
    spec(36, "AND", 1, 30),
    spec(37, "OR", 1, 30),
    spec(38, "NOT", 1, 1),
    spec(39, "MOD", 2, 2),
    spec(40, "DCOUNT", 3, 3),
    spec(41, "DSUM", 3, 3),
    spec(42, "DAVERAGE", 3, 3),
    spec(43, "DMIN", 3, 3),
    spec(44, "DMAX", 3, 3),
    spec(45, "DSTDEV", 3, 3),
    spec(46, "VAR", 1, 30),
    spec(47, "DVAR", 3, 3),
    spec(48, "TEXT", 2, 2),
    spec(49, "LINEST", 1, 4),
    spec(50, "TREND", 1, 4),
    spec(51, "LOGEST", 1, 4),
    spec(52, "GROWTH", 1, 4),
    spec(56, "PV", 3, 5),
    spec(57, "FV", 3, 5),
    spec(58, "NPER", 3, 5),
    spec(59, "PMT", 3, 5),
    spec(60, "RATE", 3, 6),
    spec(61, "MIRR", 3, 3),
    spec(62, "IRR", 1, 2),
    spec(63, "RAND", 0, 0),
    spec(64, "MATCH", 2, 3),
    spec(65, "DATE", 3, 3),
    spec(66, "TIME", 3, 3),
    spec(67, "DAY", 1, 1),
    spec(68, "MONTH", 1, 1),
    spec(69, "YEAR", 1, 1),
    spec(70, "WEEKDAY", 1, 2),
    spec(71, "HOUR", 1, 1),
    spec(72, "MINUTE", 1, 1),
    spec(73, "SECOND", 1, 1),
    spec(74, "NOW", 0, 0),
    spec(75, "AREAS", 1, 1),
    spec(76, "ROWS", 1, 1),
    spec(77, "COLUMNS", 1, 1),
    spec(78, "OFFSET", 3, 5),
    spec(82, "SEARCH", 2, 3),
    spec(83, "TRANSPOSE", 1, 1),
    spec(86, "TYPE", 1, 1),
    spec(92, "SERIESSUM", 4, 4),
    spec(97, "ATAN2", 2, 2),
    spec(98, "ASIN", 1, 1),
    spec(99, "ACOS", 1, 1),
    spec(100, "CHOOSE", 2, 30),
    spec(101, "HLOOKUP", 3, 4),
    spec(102, "VLOOKUP", 3, 4),
    spec(105, "ISREF", 1, 1),
    spec(109, "LOG", 1, 2),
    spec(111, "CHAR", 1, 1),
    spec(112, "LOWER", 1, 1),
    spec(113, "UPPER", 1, 1),
    spec(114, "PROPER", 1, 1),
    spec(115, "LEFT", 1, 2),
    spec(116, "RIGHT", 1, 2),
    spec(117, "EXACT", 2, 2),
    spec(118, "TRIM", 1, 1),
    spec(119, "REPLACE", 4, 4),
    spec(120, "SUBSTITUTE", 3, 4),
    spec(121, "CODE", 1, 1),
    spec(124, "FIND", 2, 3),
    spec(125, "CELL", 1, 2),
    spec(126, "ISERR", 1, 1),
    spec(127, "ISTEXT", 1, 1),
    spec(128, "ISNUMBER", 1, 1),
    spec(129, "ISBLANK", 1, 1),
    spec(130, "T", 1, 1),
    spec(131, "N", 1, 1),
    spec(140, "DATEVALUE", 1, 1),
    spec(141, "TIMEVALUE", 1, 1),
    spec(142, "SLN", 3, 3),
    spec(143, "SYD", 4, 4),
    spec(144, "DDB", 4, 5),
    spec(148, "INDIRECT", 1, 2),
    spec(162, "CLEAN", 1, 1),
    spec(163, "MDETERM", 1, 1),
    spec(164, "MINVERSE", 1, 1),
    spec(165, "MMULT", 2, 2),
    spec(167, "IPMT", 4, 6),
    spec(168, "PPMT", 4, 6),
    spec(169, "COUNTA", 0, 30),
    spec(183, "PRODUCT", 0, 30),
    spec(184, "FACT", 1, 1),
    spec(189, "DPRODUCT", 3, 3),
    spec(190, "ISNONTEXT", 1, 1),
    spec(193, "STDEVP", 1, 30),
    spec(194, "VARP", 1, 30),
    spec(195, "DSTDEVP", 3, 3),
    spec(196, "DVARP", 3, 3),
    spec(197, "TRUNC", 1, 2),
    spec(198, "ISLOGICAL", 1, 1),
    spec(199, "DCOUNTA", 3, 3),
    spec(204, "USDOLLAR", 1, 2),
    spec(205, "FINDB", 2, 3),
    spec(206, "SEARCHB", 2, 3),
    spec(207, "REPLACEB", 4, 4),
    spec(208, "LEFTB", 1, 2),
    spec(209, "RIGHTB", 1, 2),
    spec(210, "MIDB", 3, 3),
    spec(211, "LENB", 1, 1),
    spec(212, "ROUNDUP", 2, 2),
    spec(213, "ROUNDDOWN", 2, 2),
    spec(214, "ASC", 1, 1),
    spec(215, "DBCS", 1, 1),
    spec(216, "RANK", 2, 3),
    spec(219, "ADDRESS", 2, 5),
    spec(220, "DAYS360", 2, 3),
    spec(221, "TODAY", 0, 0),
    spec(222, "VDB", 5, 7),
    spec(227, "MEDIAN", 1, 30),
    spec(228, "SUMPRODUCT", 1, 30),
    spec(229, "SINH", 1, 1),
    spec(230, "COSH", 1, 1),
    spec(231, "TANH", 1, 1),
    spec(232, "ASINH", 1, 1),
    spec(233, "ACOSH", 1, 1),
    spec(234, "ATANH", 1, 1),
    spec(235, "DGET", 3, 3),
    spec(244, "INFO", 1, 1),
    spec(247, "DB", 4, 5),
    spec(252, "FREQUENCY", 2, 2),
    spec(261, "ERROR.TYPE", 1, 1),
    spec(269, "AVEDEV", 1, 30),
    spec(270, "BETADIST", 3, 5),
    spec(271, "GAMMALN", 1, 1),
    spec(272, "BETAINV", 3, 5),
    spec(273, "BINOMDIST", 4, 4),
    spec(274, "CHIDIST", 2, 2),
    spec(275, "CHIINV", 2, 2),
    spec(276, "COMBIN", 2, 2),
    spec(277, "CONFIDENCE", 3, 3),
    spec(278, "CRITBINOM", 3, 3),
    spec(279, "EVEN", 1, 1),
    spec(280, "EXPONDIST", 3, 3),
    spec(281, "FDIST", 3, 3),
    spec(282, "FINV", 3, 3),
    spec(283, "FISHER", 1, 1),
    spec(284, "FISHERINV", 1, 1),
    spec(285, "FLOOR", 2, 2),
    spec(286, "GAMMADIST", 4, 4),
    spec(287, "GAMMAINV", 3, 3),
    spec(288, "CEILING", 2, 2),
    spec(289, "HYPGEOMDIST", 4, 4),
    spec(290, "LOGNORMDIST", 3, 3),
    spec(291, "LOGINV", 3, 3),
    spec(292, "NEGBINOMDIST", 3, 3),
    spec(293, "NORMDIST", 4, 4),
    spec(294, "NORMSDIST", 1, 1),
    spec(295, "NORMINV", 3, 3),
    spec(296, "NORMSINV", 1, 1),
    spec(297, "STANDARDIZE", 3, 3),
    spec(298, "ODD", 1, 1),
    spec(299, "PERMUT", 2, 2),
    spec(300, "POISSON", 3, 3),
    spec(301, "TDIST", 3, 3),
    spec(302, "WEIBULL", 4, 4),
    spec(303, "SUMXMY2", 2, 2),
    spec(304, "SUMX2MY2", 2, 2),
    spec(305, "SUMX2PY2", 2, 2),
    spec(306, "CHITEST", 2, 2),
    spec(307, "CORREL", 2, 2),
    spec(308, "COVAR", 2, 2),
    spec(309, "FORECAST", 3, 3),
    spec(310, "FTEST", 2, 2),
    spec(311, "INTERCEPT", 2, 2),
    spec(312, "PEARSON", 2, 2),
    spec(313, "RSQ", 2, 2),
    spec(314, "STEYX", 2, 2),
    spec(315, "SLOPE", 2, 2),
    spec(316, "TTEST", 4, 4),
    spec(317, "PROB", 3, 4),
    spec(318, "DEVSQ", 1, 30),
    spec(319, "GEOMEAN", 1, 30),
    spec(320, "HARMEAN", 1, 30),
    spec(321, "SUMSQ", 0, 30),
    spec(322, "KURT", 1, 30),
    spec(323, "SKEW", 1, 30),
    spec(324, "ZTEST", 2, 3),
    spec(325, "LARGE", 2, 2),
    spec(326, "SMALL", 2, 2),
    spec(327, "QUARTILE", 2, 2),
    spec(328, "PERCENTILE", 2, 2),
    spec(329, "PERCENTRANK", 2, 3),
    spec(330, "MODE", 1, 30),
    spec(331, "TRIMMEAN", 2, 2),
    spec(332, "TINV", 2, 2),
    spec(336, "CONCATENATE", 0, 30),
    spec(337, "POWER", 2, 2),
    spec(342, "RADIANS", 1, 1),
    spec(343, "DEGREES", 1, 1),
    spec(344, "SUBTOTAL", 2, 30),
    spec(345, "SUMIF", 2, 3),
    spec(346, "COUNTIF", 2, 2),
    spec(347, "COUNTBLANK", 1, 1),
    spec(350, "ISPMT", 4, 4),
    spec(351, "DATEDIF", 3, 3),
    spec(352, "DATESTRING", 1, 1),
    spec(353, "NUMBERSTRING", 2, 2),
    spec(354, "ROMAN", 1, 2),
    spec(358, "GETPIVOTDATA", 2, 2),
    spec(359, "HYPERLINK", 1, 2),
    spec(360, "PHONETIC", 1, 1),
    spec(361, "AVERAGEA", 1, 30),
    spec(362, "MAXA", 1, 30),
    spec(363, "MINA", 1, 30),
    spec(364, "STDEVPA", 1, 30),
    spec(365, "VARPA", 1, 30),
    spec(366, "STDEVA", 1, 30),
    spec(367, "VARA", 1, 30),
    spec(368, "BAHTTEXT", 1, 1),
    spec(369, "THAIDAYOFWEEK", 1, 1),
    spec(370, "THAIDIGIT", 1, 1),
    spec(371, "THAIMONTHOFYEAR", 1, 1),
    spec(372, "THAINUMSOUND", 1, 1),
    spec(373, "THAINUMSTRING", 1, 1),
    spec(374, "THAISTRINGLENGTH", 1, 1),
    spec(375, "ISTHAIDIGIT", 1, 1),
    spec(376, "ROUNDBAHTDOWN", 1, 1),
    spec(377, "ROUNDBAHTUP", 1, 1),
    spec(378, "THAIYEAR", 1, 1),
    spec(379, "RTD", 2, 5),
];

pub fn function_spec_from_id(id: u16) -> Option<&'static FunctionSpec> {
    FUNCTION_SPECS
        .binary_search_by_key(&id, |spec| spec.id)
        .ok()
        .map(|idx| &FUNCTION_SPECS[idx])
}

pub fn function_name_from_id(id: u16) -> Option<&'static str> {
    function_spec_from_id(id).map(|spec| spec.name)
}

/// Case-insensitive reverse lookup.
pub fn function_id_from_name(name: &str) -> Option<u16> {
    static MAP: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    let map = MAP.get_or_init(|| {
        FUNCTION_SPECS
            .iter()
            .map(|spec| (spec.name, spec.id))
            .collect()
    });
    map.get(name.to_ascii_uppercase().as_str()).copied()
}
