// Service-code catalog for the Correios price/deadline calculator
//
// Codes taken from the SCPP integration manual, version 2.2 (2019-09-25).
// They may no longer be current; contract customers must use the codes
// listed in their contract.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

static SERVICE_CODES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("SEDEX à vista", "04014"),
        ("PAC à vista", "04510"),
        ("SEDEX 12 (à vista)", "04782"),
        ("SEDEX 10 (à vista)", "04790"),
        ("SEDEX Hoje à vista", "04804"),
    ])
});

static SERVICE_NAMES_BY_CODE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| reverse_map(service_codes()));

// Display name -> provider code
pub fn service_codes() -> &'static HashMap<&'static str, &'static str> {
    &SERVICE_CODES
}

// Provider code -> display name, built once on first use
pub fn service_names_by_code() -> &'static HashMap<&'static str, &'static str> {
    &SERVICE_NAMES_BY_CODE
}

pub fn service_name(code: &str) -> Option<&'static str> {
    service_names_by_code().get(code).copied()
}

/// Inverts a map so every `(key, value)` pair becomes `(value, key)`.
///
/// When two keys share a value only one of them survives, and which one
/// depends on the iteration order of `map`. Callers must not rely on the
/// winner.
pub fn reverse_map<K, V>(map: &HashMap<K, V>) -> HashMap<V, K>
where
    K: Clone,
    V: Clone + Eq + Hash,
{
    map.iter().map(|(k, v)| (v.clone(), k.clone())).collect()
}

// Package formats accepted by the calculator (nCdFormato)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PackageFormat {
    BoxOrPackage,
    RollOrPrism,
    Envelope,
}

impl PackageFormat {
    pub fn code(self) -> i32 {
        match self {
            PackageFormat::BoxOrPackage => 1,
            PackageFormat::RollOrPrism => 2,
            PackageFormat::Envelope => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(PackageFormat::BoxOrPackage),
            2 => Some(PackageFormat::RollOrPrism),
            3 => Some(PackageFormat::Envelope),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PackageFormat::BoxOrPackage => "Formato caixa/pacote",
            PackageFormat::RollOrPrism => "Formato rolo/prisma",
            PackageFormat::Envelope => "Envelope",
        }
    }
}

impl From<PackageFormat> for i32 {
    fn from(format: PackageFormat) -> Self {
        format.code()
    }
}

pub fn package_format_name(code: i32) -> Option<&'static str> {
    PackageFormat::from_code(code).map(PackageFormat::description)
}
