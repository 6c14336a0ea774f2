//! Static lookup tables for label normalization.
//!
//! All tables are immutable. Exception keys are matched verbatim against the
//! whitespace-normalized label (and its upper, lower and naive title-cased forms);
//! acronym and spelling keys are lower-case single words.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// Full-label corrections for known-bad source values.
pub const EXCEPTIONS: &[(&str, &str)] = &[
    ("I.E. PAULO Freire", "Institución Educativa Paulo Freire"),
    (
        "Intitucion Educativa JOSE Yemail TOUS - SEDE SAN Isidro",
        "Institución Educativa José Yemail Tous (Sede San Isidro)",
    ),
    ("CDI LA Esperanza DE LOS Niños", "CDI La Esperanza de los Niños"),
    ("Instituto Pedagogico DEL GOLFO", "Instituto Pedagógico del Golfo"),
    ("CASA DE LA Cultura Municipal", "Casa de la Cultura Municipal"),
    ("VILLA Olimpica", "Villa Olímpica"),
    ("Laguna DE Oxidacion", "Laguna de Oxidación"),
    (
        "Biblioteca Publica Municipal Hector ROJAS Herazo",
        "Biblioteca Pública Municipal Héctor Rojas Herazo",
    ),
    (
        "Iglesia Adventista DEL Septimo DIA EL Santuario",
        "Iglesia Adventista del Séptimo Día El Santuario",
    ),
    ("Estadio DE Futbol", "Estadio de Fútbol"),
    ("CANCA DE Microfutbol VILLA Nazarth", "Cancha de Microfútbol Villa Nazareth"),
    ("Cancha DE Futbol VILLA Nazareth", "Cancha de Fútbol Villa Nazareth"),
    ("Glorieta Entrada DE Tolú", "Glorieta entrada de Tolú"),
    (
        "Intitucion Educativa JOSE Yemail TOUS - SEDE Alegria",
        "Institución Educativa José Yemail Tous (Sede Alegría)",
    ),
    (
        "Parque Regional Natural Manglares DE Guacamaya",
        "Parque Regional Natural Manglares de Guacamaya",
    ),
    (
        "Intitucion Educativa PITA EN MEDIO - SEDE LAS Cruces",
        "Institución Educativa Pita en Medio (Sede Las Cruces)",
    ),
    (
        "Intitucion Educativa PITA EN MEDIO - SEDE Principal",
        "Institución Educativa Pita en Medio (Sede Principal)",
    ),
    (
        "Intitucion Educativa PITA EN MEDIO - SEDE 2",
        "Institución Educativa Pita en Medio (Sede 2)",
    ),
    (
        "Intitucion Educativa PITA ABAJO SEDE Principal",
        "Institución Educativa Pita Abajo (Sede Principal)",
    ),
    ("Parque Corregimiento PITA ABAJO", "Parque Corregimiento Pita Abajo"),
    ("Cementerio Corregimiento PITA ABAJO", "Cementerio Corregimiento Pita Abajo"),
    (
        "Intitucion Educativa Educativo NUEVA ERA SEDE Principal",
        "Institución Educativa Nueva Era (Sede Principal)",
    ),
    (
        "Intitucion Educativa NUEVA ERA SEDE SANTA LUCIA",
        "Institución Educativa Nueva Era (Sede Santa Lucía)",
    ),
    (
        "Intitucion Educativa NUEVA ERA SEDE Puertas Negras",
        "Institución Educativa Nueva Era (Sede Puertas Negras)",
    ),
    ("Cementerio Corregimiento Puerto VIEJO", "Cementerio Corregimiento Puerto Viejo"),
    (
        "Estadio DE Softbol Corregimiento Puerto VIEJO",
        "Estadio de Sóftbol Corregimiento Puerto Viejo",
    ),
    (
        "Intitucion Educativa Puerto VIEJO SEDE Principal",
        "Institución Educativa Puerto Viejo (Sede Principal)",
    ),
    (
        "Intitucion Educativa NUEVA ERA SEDE EL Palmar",
        "Institución Educativa Nueva Era (Sede El Palmar)",
    ),
    (
        "Intitucion Educativa Puerto VIEJO SEDE PALO Blanco",
        "Institución Educativa Puerto Viejo (Sede Palo Blanco)",
    ),
    ("PISTA DE PATINAJE", "Pista de Patinaje"),
    ("PISTA DE PATNAJE", "Pista de Patinaje"),
    ("pista de patinaje", "Pista de Patinaje"),
    ("Pista De Patinaje", "Pista de Patinaje"),
    ("PISTA DE PATINAGE", "Pista de Patinaje"),
    (
        "LABORATORIO DE INVESTIGACION Y DESARROLLO DE TOLU - IDTOLU",
        "Laboratorio de Investigación y Desarrollo de Tolú - IDTOLÚ",
    ),
    (
        "Laboratorio de Investigacion Y Desarrollo de Tolú - Idtolu",
        "Laboratorio de Investigación y Desarrollo de Tolú - IDTOLÚ",
    ),
    (
        "LABORATORIO DE INVESTIGACION Y DESARROLLO DE TOLU - IDTOLÚ",
        "Laboratorio de Investigación y Desarrollo de Tolú - IDTOLÚ",
    ),
    (
        "laboratorio de investigacion y desarrollo de tolu - idtolu",
        "Laboratorio de Investigación y Desarrollo de Tolú - IDTOLÚ",
    ),
    (
        "INSTITUTO FREINET PRE ESCOLAR Y PRIMARIA",
        "Instituto Freinet Pre-Escolar y Primaria",
    ),
    (
        "Instituto Freinet Pre Escolar Y Primaria",
        "Instituto Freinet Pre-Escolar y Primaria",
    ),
    (
        "Instituto Freinet Pre-Escolar y Primaria",
        "Instituto Freinet Pre-Escolar y Primaria",
    ),
    ("OFICINA AMBIENTAL Y AGROPECUARIA", "Oficina Ambiental y Agropecuaria"),
    ("Oficina Ambiental Y Agropecuaria", "Oficina Ambiental y Agropecuaria"),
    ("CDI LA ESPERANZA DE LOS NIÑOS", "CDI La Esperanza de los Niños"),
    ("CDI la Esperanza de los Niños", "CDI La Esperanza de los Niños"),
];

/// Acronyms with a canonical rendering, keyed by lower-case form.
pub const ACRONYMS: &[(&str, &str)] = &[
    ("cdi", "CDI"),
    ("idtolu", "IDTOLÚ"),
    ("ie", "I.E."),
    ("i.e.", "I.E."),
];

/// Single-word spelling fixes, keyed by lower-case form.
pub const SPELLING_FIXES: &[(&str, &str)] = &[
    ("tolu", "Tolú"),
    ("turistico", "Turístico"),
    ("futbol", "Fútbol"),
    ("microfutbol", "Microfútbol"),
    ("softbol", "Sóftbol"),
    ("pedagogico", "Pedagógico"),
    ("oxidacion", "Oxidación"),
    ("publica", "Pública"),
    ("septimo", "Séptimo"),
    ("dia", "Día"),
    ("nazarth", "Nazareth"),
    ("alegria", "Alegría"),
    ("lucia", "Lucía"),
    ("canca", "Cancha"),
    ("patinaje", "Patinaje"),
    ("patnaje", "Patinaje"),
];

/// Articles, prepositions and conjunctions rendered lower-case after the first word.
pub const MINOR_WORDS: &[&str] = &[
    "de", "del", "la", "las", "los", "el", "en", "por", "para", "con", "sin", "sobre", "bajo",
    "entre", "hasta", "desde", "durante", "mediante", "según", "contra", "hacia", "tras", "y",
    "o", "a", "un", "una", "unos", "unas",
];

lazy_static! {
    pub static ref EXCEPTION_MAP: HashMap<&'static str, &'static str> =
        EXCEPTIONS.iter().copied().collect();
    pub static ref ACRONYM_MAP: HashMap<&'static str, &'static str> =
        ACRONYMS.iter().copied().collect();
    /// Keyed by the misspelling and by the lower-cased correction, so corrected words
    /// map to themselves.
    pub static ref SPELLING_MAP: HashMap<String, &'static str> = {
        let mut map: HashMap<String, &'static str> = SPELLING_FIXES
            .iter()
            .map(|(wrong, fixed)| (wrong.to_string(), *fixed))
            .collect();
        for (_, fixed) in SPELLING_FIXES {
            map.entry(fixed.to_lowercase()).or_insert(*fixed);
        }
        map
    };
    pub static ref MINOR_WORD_SET: HashSet<&'static str> = MINOR_WORDS.iter().copied().collect();
}

pub fn lookup_exception(label: &str) -> Option<&'static str> {
    EXCEPTION_MAP.get(label).copied()
}

pub fn lookup_acronym(word_lower: &str) -> Option<&'static str> {
    ACRONYM_MAP.get(word_lower).copied()
}

pub fn lookup_spelling(word_lower: &str) -> Option<&'static str> {
    SPELLING_MAP.get(word_lower).copied()
}

pub fn is_minor_word(word_lower: &str) -> bool {
    MINOR_WORD_SET.contains(word_lower)
}
