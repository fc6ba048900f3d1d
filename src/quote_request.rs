// Request parameters for one price/deadline query
//
// Nothing here is validated. The calculator rejects bad values itself and
// reports them through Erro/MsgErro in the response.

use serde::{Deserialize, Serialize};

// Fixed parameters: ask for an XML body and for both price and deadline
pub const RESPONSE_FORMAT: (&str, &str) = ("StrRetorno", "xml");
pub const CALCULATION_MODE: (&str, &str) = ("nIndicaCalculo", "3");

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuoteRequest {
    // Contract credentials, empty when there is no contract
    pub company_code: String,
    pub password: String,
    pub service_code: String,
    // Postal codes, digits only
    pub origin_cep: String,
    pub destination_cep: String,
    // Kilograms, sent exactly as given
    pub weight: String,
    // 1 box/package, 2 roll/prism, 3 envelope
    pub format: i32,
    // Centimetres. Height must be 0 for envelopes
    pub length: f64,
    pub height: f64,
    pub width: f64,
    pub diameter: f64,
    // "S" or "N"
    pub hand_delivery: String,
    // 0 when no declared value is wanted
    pub declared_value: f64,
    // "S" or "N"
    pub receipt_notice: String,
}

impl Default for QuoteRequest {
    fn default() -> Self {
        Self {
            company_code: String::new(),
            password: String::new(),
            service_code: String::new(),
            origin_cep: String::new(),
            destination_cep: String::new(),
            weight: String::new(),
            format: 1,
            length: 0.0,
            height: 0.0,
            width: 0.0,
            diameter: 0.0,
            hand_delivery: Self::flag(false).to_string(),
            declared_value: 0.0,
            receipt_notice: Self::flag(false).to_string(),
        }
    }
}

impl QuoteRequest {
    /// Maps a boolean to the calculator's yes/no convention ("S"/"N").
    pub fn flag(enabled: bool) -> &'static str {
        if enabled {
            "S"
        } else {
            "N"
        }
    }

    /// Query parameters in the order they are sent.
    ///
    /// Every field is present even when empty. Dimensions and the declared
    /// value are always written with two decimals. Values are not
    /// percent-encoded here; that happens when the pairs are attached to
    /// the endpoint URL.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("nCdEmpresa", self.company_code.clone()),
            ("sDsSenha", self.password.clone()),
            ("nCdServico", self.service_code.clone()),
            ("sCepOrigem", self.origin_cep.clone()),
            ("sCepDestino", self.destination_cep.clone()),
            ("nVlPeso", self.weight.clone()),
            ("nCdFormato", self.format.to_string()),
            ("nVlComprimento", format!("{:.2}", self.length)),
            ("nVlAltura", format!("{:.2}", self.height)),
            ("nVlLargura", format!("{:.2}", self.width)),
            ("nVlDiametro", format!("{:.2}", self.diameter)),
            ("sCdMaoPropria", self.hand_delivery.clone()),
            ("nVlValorDeclarado", format!("{:.2}", self.declared_value)),
            ("sCdAvisoRecebimento", self.receipt_notice.clone()),
            (RESPONSE_FORMAT.0, RESPONSE_FORMAT.1.to_string()),
            (CALCULATION_MODE.0, CALCULATION_MODE.1.to_string()),
        ]
    }
}
