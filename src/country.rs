//! Country name standardization and numeric code lookup.
//!
//! Pure functions over two static tables: a synonym table mapping the forms
//! the OCR provider actually emits (English names, ISO alpha-3 codes,
//! Spanish/English gentilic forms, formal state names) to one canonical
//! Spanish-language country name, and a second table from canonical name to
//! the fixed numeric code used in the export schema.

use serde::Serialize;

/// Canonical name → numeric country code used in the export schema.
static COUNTRY_CODES: phf::Map<&'static str, u32> = phf::phf_map! {
    "ALEMANIA" => 0,
    "ARGENTINA" => 1,
    "ARMENIA" => 1,
    "AUSTRALIA" => 2,
    "AUSTRIA" => 3,
    "BELGICA" => 4,
    "BOLIVIA" => 5,
    "BRASIL" => 6,
    "BULGARIA" => 7,
    "CANADA" => 8,
    "CHILE" => 9,
    "CHINA" => 10,
    "COLOMBIA" => 11,
    "CONGO" => 12,
    "COREA DEMOCRATICA" => 13,
    "COREA REPUBLICANA" => 14,
    "COSTA RICA" => 15,
    "CROACIA" => 16,
    "CUBA" => 17,
    "DINAMARCA" => 18,
    "ECUADOR" => 19,
    "EGIPTO" => 20,
    "EL SALVADOR" => 21,
    "ESLOVAQUIA" => 22,
    "ESLOVENIA" => 23,
    "ESPAÑA" => 24,
    "ESTADOS UNIDOS" => 25,
    "FILIPINAS" => 26,
    "FINLANDIA" => 27,
    "FRANCIA" => 28,
    "GRECIA" => 29,
    "GUATEMALA" => 30,
    "GUYANA" => 31,
    "HAITI" => 32,
    "HONDURAS" => 33,
    "HUNGRIA" => 35,
    "INDIA" => 36,
    "INDONESIA" => 37,
    "IRLANDA" => 38,
    "ISLANDIA" => 39,
    "ISRAEL" => 40,
    "ITALIA" => 41,
    "JAMAICA" => 42,
    "JAPON" => 43,
    "JORDANIA" => 44,
    "KENYA" => 45,
    "LIBANO" => 46,
    "LITUANIA" => 47,
    "LUXEMBURGO" => 48,
    "MALASIA" => 49,
    "MARRUECOS" => 50,
    "MEXICO" => 51,
    "MONACO" => 52,
    "NICARAGUA" => 53,
    "NORUEGA" => 54,
    "NUEVA ZELANDA" => 55,
    "PAISES BAJOS" => 56,
    "PANAMA" => 57,
    "PARAGUAY" => 58,
    "PERU" => 59,
    "POLONIA" => 60,
    "PORTUGAL" => 61,
    "PUERTO RICO" => 62,
    "INGLATERRA" => 63,
    "REPUBLICA CHECA" => 64,
    "REPUBLICA DOMINICANA" => 65,
    "RUMANIA" => 66,
    "RUSIA" => 67,
    "SANTA SEDE" => 68,
    "SENEGAL" => 69,
    "SERBIA" => 70,
    "SINGAPUR" => 71,
    "SIRIA" => 72,
    "SUDAFRICA" => 73,
    "SUECIA" => 74,
    "SUIZA" => 75,
    "SURINAME" => 76,
    "TAILANDIA" => 77,
    "TAIWAN" => 78,
    "TURQUIA" => 79,
    "UCRANIA" => 80,
    "URUGUAY" => 81,
    "VENEZUELA" => 82,
    "VIETNAM" => 83,
};

/// Variant form → canonical Spanish name. Keys are already uppercased and
/// trimmed; lookup input must be too. Covers English names, ISO alpha-3
/// codes, gentilic forms (both languages, accented and plain), and the
/// formal state names passports carry.
static COUNTRY_SYNONYMS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    // United States
    "USA" => "ESTADOS UNIDOS",
    "US" => "ESTADOS UNIDOS",
    "UNITED STATES" => "ESTADOS UNIDOS",
    "UNITED STATES OF AMERICA" => "ESTADOS UNIDOS",
    "AMERICAN" => "ESTADOS UNIDOS",
    "ESTADOUNIDENSE" => "ESTADOS UNIDOS",
    "NORTEAMERICANA" => "ESTADOS UNIDOS",
    "NORTEAMERICANO" => "ESTADOS UNIDOS",
    // United Kingdom
    "UK" => "INGLATERRA",
    "GBR" => "INGLATERRA",
    "UNITED KINGDOM" => "INGLATERRA",
    "GREAT BRITAIN" => "INGLATERRA",
    "BRITISH" => "INGLATERRA",
    "BRITISH CITIZEN" => "INGLATERRA",
    "BRITANICA" => "INGLATERRA",
    "BRITANICO" => "INGLATERRA",
    "BRITÁNICA" => "INGLATERRA",
    "BRITÁNICO" => "INGLATERRA",
    // Germany
    "GERMANY" => "ALEMANIA",
    "DEU" => "ALEMANIA",
    "DEUTSCH" => "ALEMANIA",
    "GERMAN" => "ALEMANIA",
    "FEDERAL REPUBLIC OF GERMANY" => "ALEMANIA",
    "ALEMANA" => "ALEMANIA",
    "ALEMAN" => "ALEMANIA",
    "ALEMÁN" => "ALEMANIA",
    // France
    "FRANCE" => "FRANCIA",
    "FRA" => "FRANCIA",
    "FRENCH" => "FRANCIA",
    "FRANCESA" => "FRANCIA",
    "FRANCES" => "FRANCIA",
    "FRANCÉS" => "FRANCIA",
    "FRANÇAISE" => "FRANCIA",
    // Spain
    "SPAIN" => "ESPAÑA",
    "ESP" => "ESPAÑA",
    "SPANISH" => "ESPAÑA",
    "ESPANOLA" => "ESPAÑA",
    "ESPANOL" => "ESPAÑA",
    "ESPAÑOLA" => "ESPAÑA",
    "ESPAÑOL" => "ESPAÑA",
    "KINGDOM OF SPAIN" => "ESPAÑA",
    "ESPANA" => "ESPAÑA",
    // Brazil
    "BRAZIL" => "BRASIL",
    "BRA" => "BRASIL",
    "BRAZILIAN" => "BRASIL",
    "BRASILEIRA" => "BRASIL",
    "BRASILEIRO" => "BRASIL",
    "BRASILEÑA" => "BRASIL",
    "BRASILEÑO" => "BRASIL",
    "FEDERATIVE REPUBLIC OF BRAZIL" => "BRASIL",
    // Argentina
    "ARG" => "ARGENTINA",
    "ARGENTINE" => "ARGENTINA",
    "ARGENTINIAN" => "ARGENTINA",
    "REPUBLICA ARGENTINA" => "ARGENTINA",
    "ARGENTINE REPUBLIC" => "ARGENTINA",
    // Ireland
    "IRELAND" => "IRLANDA",
    "IRL" => "IRLANDA",
    "IRISH" => "IRLANDA",
    "IRLANDESA" => "IRLANDA",
    "IRLANDES" => "IRLANDA",
    "ÉIRE" => "IRLANDA",
    // Italy
    "ITALY" => "ITALIA",
    "ITA" => "ITALIA",
    "ITALIAN" => "ITALIA",
    "ITALIANA" => "ITALIA",
    "ITALIANO" => "ITALIA",
    "REPUBBLICA ITALIANA" => "ITALIA",
    // Portugal
    "PRT" => "PORTUGAL",
    "PORTUGUESE" => "PORTUGAL",
    "PORTUGUESA" => "PORTUGAL",
    "PORTUGUES" => "PORTUGAL",
    // Netherlands
    "NETHERLANDS" => "PAISES BAJOS",
    "NLD" => "PAISES BAJOS",
    "HOLANDA" => "PAISES BAJOS",
    "DUTCH" => "PAISES BAJOS",
    "NEDERLANDSE" => "PAISES BAJOS",
    "HOLANDESA" => "PAISES BAJOS",
    "HOLANDES" => "PAISES BAJOS",
    "KINGDOM OF THE NETHERLANDS" => "PAISES BAJOS",
    // Switzerland
    "SWITZERLAND" => "SUIZA",
    "CHE" => "SUIZA",
    "SWISS" => "SUIZA",
    "SUIZO" => "SUIZA",
    "SCHWEIZ" => "SUIZA",
    // Mexico
    "MEX" => "MEXICO",
    "MEXICAN" => "MEXICO",
    "MEXICANA" => "MEXICO",
    "MEXICANO" => "MEXICO",
    "MÉXICO" => "MEXICO",
    "ESTADOS UNIDOS MEXICANOS" => "MEXICO",
    // China
    "CHN" => "CHINA",
    "CHINESE" => "CHINA",
    "PEOPLE'S REPUBLIC OF CHINA" => "CHINA",
    "REPUBLICA POPULAR CHINA" => "CHINA",
    // Japan
    "JAPAN" => "JAPON",
    "JPN" => "JAPON",
    "JAPANESE" => "JAPON",
    "JAPONESA" => "JAPON",
    "JAPONES" => "JAPON",
    "JAPÓN" => "JAPON",
    // Koreas
    "SOUTH KOREA" => "COREA REPUBLICANA",
    "KOR" => "COREA REPUBLICANA",
    "REPUBLIC OF KOREA" => "COREA REPUBLICANA",
    "COREA DEL SUR" => "COREA REPUBLICANA",
    "NORTH KOREA" => "COREA DEMOCRATICA",
    "PRK" => "COREA DEMOCRATICA",
    "COREA DEL NORTE" => "COREA DEMOCRATICA",
    // Russia
    "RUSSIA" => "RUSIA",
    "RUS" => "RUSIA",
    "RUSSIAN" => "RUSIA",
    "RUSSIAN FEDERATION" => "RUSIA",
    "RUSA" => "RUSIA",
    "RUSO" => "RUSIA",
    // Rest of the Americas
    "CAN" => "CANADA",
    "CANADIAN" => "CANADA",
    "CANADIENSE" => "CANADA",
    "CANADÁ" => "CANADA",
    "CHL" => "CHILE",
    "CHILEAN" => "CHILE",
    "CHILENA" => "CHILE",
    "CHILENO" => "CHILE",
    "COL" => "COLOMBIA",
    "COLOMBIAN" => "COLOMBIA",
    "COLOMBIANA" => "COLOMBIA",
    "COLOMBIANO" => "COLOMBIA",
    "PER" => "PERU",
    "PERUVIAN" => "PERU",
    "PERUANA" => "PERU",
    "PERUANO" => "PERU",
    "PERÚ" => "PERU",
    "URY" => "URUGUAY",
    "URUGUAYAN" => "URUGUAY",
    "URUGUAYA" => "URUGUAY",
    "URUGUAYO" => "URUGUAY",
    "PRY" => "PARAGUAY",
    "PARAGUAYA" => "PARAGUAY",
    "PARAGUAYO" => "PARAGUAY",
    "BOL" => "BOLIVIA",
    "BOLIVIANA" => "BOLIVIA",
    "BOLIVIANO" => "BOLIVIA",
    "VEN" => "VENEZUELA",
    "VENEZOLANA" => "VENEZUELA",
    "VENEZOLANO" => "VENEZUELA",
    "BOLIVARIAN REPUBLIC OF VENEZUELA" => "VENEZUELA",
    "ECU" => "ECUADOR",
    "ECUATORIANA" => "ECUADOR",
    "ECUATORIANO" => "ECUADOR",
    "CUB" => "CUBA",
    "CUBANA" => "CUBA",
    "CUBANO" => "CUBA",
    "DOMINICAN REPUBLIC" => "REPUBLICA DOMINICANA",
    "DOM" => "REPUBLICA DOMINICANA",
    "DOMINICANA" => "REPUBLICA DOMINICANA",
    "DOMINICANO" => "REPUBLICA DOMINICANA",
    // Remaining Europe
    "AUT" => "AUSTRIA",
    "AUSTRIAN" => "AUSTRIA",
    "AUSTRIACA" => "AUSTRIA",
    "AUSTRIACO" => "AUSTRIA",
    "BELGIUM" => "BELGICA",
    "BEL" => "BELGICA",
    "BELGIAN" => "BELGICA",
    "BELGA" => "BELGICA",
    "BÉLGICA" => "BELGICA",
    "POLAND" => "POLONIA",
    "POL" => "POLONIA",
    "POLISH" => "POLONIA",
    "POLACA" => "POLONIA",
    "POLACO" => "POLONIA",
    "SWEDEN" => "SUECIA",
    "SWE" => "SUECIA",
    "SWEDISH" => "SUECIA",
    "SUECA" => "SUECIA",
    "SUECO" => "SUECIA",
    "NORWAY" => "NORUEGA",
    "NOR" => "NORUEGA",
    "NORWEGIAN" => "NORUEGA",
    "NORUEGO" => "NORUEGA",
    "DENMARK" => "DINAMARCA",
    "DNK" => "DINAMARCA",
    "DANISH" => "DINAMARCA",
    "DANESA" => "DINAMARCA",
    "DANES" => "DINAMARCA",
    "FINLAND" => "FINLANDIA",
    "FIN" => "FINLANDIA",
    "FINNISH" => "FINLANDIA",
    "FINLANDESA" => "FINLANDIA",
    "GREECE" => "GRECIA",
    "GRC" => "GRECIA",
    "GREEK" => "GRECIA",
    "GRIEGA" => "GRECIA",
    "GRIEGO" => "GRECIA",
    "CZECH REPUBLIC" => "REPUBLICA CHECA",
    "CZE" => "REPUBLICA CHECA",
    "CZECHIA" => "REPUBLICA CHECA",
    "CHECA" => "REPUBLICA CHECA",
    "CHECO" => "REPUBLICA CHECA",
    "HUNGARY" => "HUNGRIA",
    "HUN" => "HUNGRIA",
    "HUNGARIAN" => "HUNGRIA",
    "HUNGRÍA" => "HUNGRIA",
    "HÚNGARA" => "HUNGRIA",
    "ROMANIA" => "RUMANIA",
    "ROU" => "RUMANIA",
    "ROMANIAN" => "RUMANIA",
    "RUMANA" => "RUMANIA",
    "RUMANO" => "RUMANIA",
    "UKRAINE" => "UCRANIA",
    "UKR" => "UCRANIA",
    "UKRAINIAN" => "UCRANIA",
    "UCRANIANA" => "UCRANIA",
    "UCRANIANO" => "UCRANIA",
    "CROATIA" => "CROACIA",
    "HRV" => "CROACIA",
    "CROATA" => "CROACIA",
    "SLOVAKIA" => "ESLOVAQUIA",
    "SVK" => "ESLOVAQUIA",
    "SLOVENIA" => "ESLOVENIA",
    "SVN" => "ESLOVENIA",
    "LITHUANIA" => "LITUANIA",
    "LTU" => "LITUANIA",
    "LITUANA" => "LITUANIA",
    "BULGARIAN" => "BULGARIA",
    "BGR" => "BULGARIA",
    "SERBIA AND MONTENEGRO" => "SERBIA",
    "SRB" => "SERBIA",
    "SERBIAN" => "SERBIA",
    "SERBIA Y MONTENEGRO" => "SERBIA",
    "LUXEMBOURG" => "LUXEMBURGO",
    "LUX" => "LUXEMBURGO",
    "ICELAND" => "ISLANDIA",
    "ISL" => "ISLANDIA",
    "TURKEY" => "TURQUIA",
    "TUR" => "TURQUIA",
    "TURCA" => "TURQUIA",
    "TURCO" => "TURQUIA",
    "TURQUÍA" => "TURQUIA",
    "HOLY SEE" => "SANTA SEDE",
    "VAT" => "SANTA SEDE",
    "VATICANO" => "SANTA SEDE",
    // Rest of the world
    "AUS" => "AUSTRALIA",
    "AUSTRALIAN" => "AUSTRALIA",
    "AUSTRALIANA" => "AUSTRALIA",
    "AUSTRALIANO" => "AUSTRALIA",
    "NEW ZEALAND" => "NUEVA ZELANDA",
    "NZL" => "NUEVA ZELANDA",
    "NEOZELANDESA" => "NUEVA ZELANDA",
    "IND" => "INDIA",
    "INDIAN" => "INDIA",
    "REPUBLIC OF INDIA" => "INDIA",
    "IDN" => "INDONESIA",
    "INDONESIAN" => "INDONESIA",
    "PHILIPPINES" => "FILIPINAS",
    "PHL" => "FILIPINAS",
    "FILIPINA" => "FILIPINAS",
    "FILIPINO" => "FILIPINAS",
    "THAILAND" => "TAILANDIA",
    "THA" => "TAILANDIA",
    "THAI" => "TAILANDIA",
    "TAILANDESA" => "TAILANDIA",
    "VNM" => "VIETNAM",
    "VIET NAM" => "VIETNAM",
    "VIETNAMITA" => "VIETNAM",
    "MALAYSIA" => "MALASIA",
    "MYS" => "MALASIA",
    "MALAYSIAN" => "MALASIA",
    "SINGAPORE" => "SINGAPUR",
    "SGP" => "SINGAPUR",
    "TWN" => "TAIWAN",
    "TAIWANESE" => "TAIWAN",
    "TAIWÁN" => "TAIWAN",
    "ISR" => "ISRAEL",
    "ISRAELI" => "ISRAEL",
    "ISRAELÍ" => "ISRAEL",
    "LEBANON" => "LIBANO",
    "LBN" => "LIBANO",
    "LIBANESA" => "LIBANO",
    "LIBANES" => "LIBANO",
    "LÍBANO" => "LIBANO",
    "JORDAN" => "JORDANIA",
    "JOR" => "JORDANIA",
    "SYRIA" => "SIRIA",
    "SYR" => "SIRIA",
    "SYRIAN ARAB REPUBLIC" => "SIRIA",
    "SIRIA ARABE" => "SIRIA",
    "EGYPT" => "EGIPTO",
    "EGY" => "EGIPTO",
    "EGYPTIAN" => "EGIPTO",
    "EGIPCIA" => "EGIPTO",
    "EGIPCIO" => "EGIPTO",
    "MOROCCO" => "MARRUECOS",
    "MAR" => "MARRUECOS",
    "MOROCCAN" => "MARRUECOS",
    "MARROQUI" => "MARRUECOS",
    "MARROQUÍ" => "MARRUECOS",
    "SOUTH AFRICA" => "SUDAFRICA",
    "ZAF" => "SUDAFRICA",
    "SUDÁFRICA" => "SUDAFRICA",
    "SUDAFRICANA" => "SUDAFRICA",
    "KEN" => "KENYA",
    "KENIA" => "KENYA",
    "KENYAN" => "KENYA",
    "SEN" => "SENEGAL",
    "SENEGALESA" => "SENEGAL",
    "COG" => "CONGO",
    "COD" => "CONGO",
    "REPUBLICA DEL CONGO" => "CONGO",
};

/// Country code as exported: a numeric code when the canonical name is in
/// the table, otherwise the name itself (the export fails open rather than
/// erroring on countries the table does not know).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CountryCode {
    Code(u32),
    Unmapped(String),
}

impl CountryCode {
    pub fn as_number(&self) -> Option<u32> {
        match self {
            CountryCode::Code(n) => Some(*n),
            CountryCode::Unmapped(_) => None,
        }
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountryCode::Code(n) => write!(f, "{}", n),
            CountryCode::Unmapped(s) => write!(f, "{}", s),
        }
    }
}

/// Map a raw country/nationality string to its canonical Spanish name.
/// Unmapped input passes through uppercased and trimmed, never errors.
pub fn standardize_country(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    match COUNTRY_SYNONYMS.get(upper.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => upper,
    }
}

/// Look up the numeric code for a canonical country name.
pub fn country_code(canonical: &str) -> CountryCode {
    match COUNTRY_CODES.get(canonical) {
        Some(code) => CountryCode::Code(*code),
        None => CountryCode::Unmapped(canonical.to_string()),
    }
}
