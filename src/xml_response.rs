// Structures for the calculator's XML answer and the decoder that fills them
//
// Every value is kept as the text the provider sent. Prices use a decimal
// comma and sometimes a currency prefix, so nothing is parsed here.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::charset;
use crate::service_codes;

pub const ROOT_ELEMENT: &str = "Servicos";
pub const SERVICE_ELEMENT: &str = "cServico";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty response body")]
    EmptyBody,

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Unexpected root element <{0}>, expected <Servicos>")]
    UnexpectedRoot(String),

    #[error("Malformed XML: {0}")]
    Malformed(String),
}

impl From<quick_xml::Error> for DecodeError {
    fn from(err: quick_xml::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct QuoteResponse {
    // Document order, one per requested service
    pub services: Vec<QuoteRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct QuoteRecord {
    pub codigo: String,
    pub valor: String,
    pub prazo_entrega: String,
    pub valor_sem_adicionais: String,
    pub valor_mao_propria: String,
    pub valor_aviso_recebimento: String,
    pub valor_valor_declarado: String,
    pub entrega_domiciliar: String,
    pub entrega_sabado: String,
    #[serde(rename = "obsFim")]
    pub obs_fim: String,
    pub erro: String,
    pub msg_erro: String,
}

impl QuoteRecord {
    /// Display name of the service, when the code is in the local catalog.
    pub fn service_name(&self) -> Option<&'static str> {
        service_codes::service_name(self.codigo.trim())
    }

    /// True when the provider rejected this service. "0" and an empty
    /// `Erro` both mean success.
    pub fn has_error(&self) -> bool {
        let code = self.erro.trim();
        !code.is_empty() && code != "0"
    }

    fn field_mut(&mut self, name: &[u8]) -> Option<&mut String> {
        let field = match name {
            b"Codigo" => &mut self.codigo,
            b"Valor" => &mut self.valor,
            b"PrazoEntrega" => &mut self.prazo_entrega,
            b"ValorSemAdicionais" => &mut self.valor_sem_adicionais,
            b"ValorMaoPropria" => &mut self.valor_mao_propria,
            b"ValorAvisoRecebimento" => &mut self.valor_aviso_recebimento,
            b"ValorValorDeclarado" => &mut self.valor_valor_declarado,
            b"EntregaDomiciliar" => &mut self.entrega_domiciliar,
            b"EntregaSabado" => &mut self.entrega_sabado,
            b"obsFim" => &mut self.obs_fim,
            b"Erro" => &mut self.erro,
            b"MsgErro" => &mut self.msg_erro,
            _ => return None,
        };
        Some(field)
    }
}

impl QuoteResponse {
    /// Decodes a raw response body, detecting its charset first.
    pub fn from_bytes(body: &[u8], content_type: Option<&str>) -> Result<Self, DecodeError> {
        let text = charset::transcode(body, content_type)?;
        Self::from_xml(&text)
    }

    /// Decodes an already transcoded document.
    ///
    /// Field text is copied as is, surrounding whitespace included. Unknown
    /// elements are skipped and reading stops once `<Servicos>` is closed.
    pub fn from_xml(xml: &str) -> Result<Self, DecodeError> {
        let mut reader = Reader::from_str(xml);
        let mut services = Vec::new();
        // Names of the currently open elements, root first
        let mut open: Vec<Vec<u8>> = Vec::new();
        let mut current: Option<QuoteRecord> = None;
        let mut text = String::new();
        let mut root_seen = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = e.name().as_ref().to_vec();
                    if !root_seen {
                        check_root(&name)?;
                        root_seen = true;
                    } else if open.len() == 1 && name == SERVICE_ELEMENT.as_bytes() {
                        current = Some(QuoteRecord::default());
                    } else if open.len() == 2 {
                        text.clear();
                    }
                    open.push(name);
                }
                Event::Empty(e) => {
                    let name = e.name();
                    if !root_seen {
                        check_root(name.as_ref())?;
                        break;
                    }
                    if open.len() == 1 && name.as_ref() == SERVICE_ELEMENT.as_bytes() {
                        services.push(QuoteRecord::default());
                    }
                }
                Event::End(_) => {
                    let name = open.pop().unwrap_or_default();
                    match open.len() {
                        // Root closed
                        0 => break,
                        1 if name == SERVICE_ELEMENT.as_bytes() => {
                            if let Some(record) = current.take() {
                                trace!(codigo = %record.codigo, "Decoded service record");
                                services.push(record);
                            }
                        }
                        2 => {
                            if let Some(field) =
                                current.as_mut().and_then(|record| record.field_mut(&name))
                            {
                                *field = std::mem::take(&mut text);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(e) if in_field(&open, &current) => {
                    text.push_str(utf8(&e)?);
                }
                Event::CData(e) if in_field(&open, &current) => {
                    text.push_str(utf8(&e)?);
                }
                Event::GeneralRef(e) if in_field(&open, &current) => {
                    text.push(resolve_reference(utf8(&e)?)?);
                }
                Event::Eof => {
                    if !root_seen {
                        return Err(DecodeError::Malformed("no root element".to_string()));
                    }
                    if !open.is_empty() {
                        return Err(DecodeError::Malformed(format!(
                            "document ended inside <{}>",
                            String::from_utf8_lossy(open.last().map_or(&[][..], Vec::as_slice))
                        )));
                    }
                    break;
                }
                _ => {}
            }
        }

        debug!(count = services.len(), "Decoded quote response");
        Ok(QuoteResponse { services })
    }
}

fn check_root(name: &[u8]) -> Result<(), DecodeError> {
    if name == ROOT_ELEMENT.as_bytes() {
        Ok(())
    } else {
        Err(DecodeError::UnexpectedRoot(
            String::from_utf8_lossy(name).into_owned(),
        ))
    }
}

// Directly inside a field of a cServico record
fn in_field(open: &[Vec<u8>], current: &Option<QuoteRecord>) -> bool {
    open.len() == 3 && current.is_some()
}

fn utf8(bytes: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn resolve_reference(name: &str) -> Result<char, DecodeError> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }),
    };
    resolved.ok_or_else(|| DecodeError::Malformed(format!("unknown entity &{};", name)))
}

// A trimmed-down answer for a SEDEX and a PAC quote, the second one rejected
pub const SAMPLE_RESPONSE_XML: &str = r#"<?xml version="1.0" encoding="ISO-8859-1" ?>
<Servicos>
  <cServico>
    <Codigo>04014</Codigo>
    <Valor>34,50</Valor>
    <PrazoEntrega>1</PrazoEntrega>
    <ValorSemAdicionais>34,50</ValorSemAdicionais>
    <ValorMaoPropria>0,00</ValorMaoPropria>
    <ValorAvisoRecebimento>0,00</ValorAvisoRecebimento>
    <ValorValorDeclarado>0,00</ValorValorDeclarado>
    <EntregaDomiciliar>S</EntregaDomiciliar>
    <EntregaSabado>S</EntregaSabado>
    <obsFim></obsFim>
    <Erro>0</Erro>
    <MsgErro></MsgErro>
  </cServico>
  <cServico>
    <Codigo>04510</Codigo>
    <Valor>0,00</Valor>
    <PrazoEntrega>0</PrazoEntrega>
    <ValorSemAdicionais>0,00</ValorSemAdicionais>
    <ValorMaoPropria>0,00</ValorMaoPropria>
    <ValorAvisoRecebimento>0,00</ValorAvisoRecebimento>
    <ValorValorDeclarado>0,00</ValorValorDeclarado>
    <EntregaDomiciliar></EntregaDomiciliar>
    <EntregaSabado></EntregaSabado>
    <obsFim></obsFim>
    <Erro>-3</Erro>
    <MsgErro>CEP de destino invalido.</MsgErro>
  </cServico>
</Servicos>"#;
