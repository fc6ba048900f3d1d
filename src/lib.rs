// Client library for the Correios price/deadline calculator (CalcPrecoPrazo)

pub mod charset;
pub mod client;
pub mod quote_request;
pub mod service_codes;
pub mod xml_response;

// Re-export key types for convenience
pub use client::{
    build_url, ClientConfig, ClientError, CorreiosClient, QuoteClient, QuoteError,
    DEFAULT_BASE_URL,
};
pub use quote_request::QuoteRequest;
pub use service_codes::{
    package_format_name, reverse_map, service_codes, service_name, service_names_by_code,
    PackageFormat,
};
pub use xml_response::{DecodeError, QuoteRecord, QuoteResponse};
