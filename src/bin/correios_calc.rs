use anyhow::{Context, Result};
use clap::Parser;
use correios_calc::{ClientConfig, CorreiosClient, QuoteClient, QuoteRequest, DEFAULT_BASE_URL};

/// correios_calc - price and delivery time for a Correios shipment
///
/// Without arguments it asks for SEDEX à vista (04014) from 70002900 to
/// 04547000, 1 kg, 20x20x20 cm box, no extra services.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Calculator endpoint
    #[arg(long, env = "CORREIOS_ENDPOINT", default_value = DEFAULT_BASE_URL)]
    endpoint: String,

    /// Request timeout in milliseconds (no timeout when omitted)
    #[arg(long, env = "CORREIOS_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Contract company code
    #[arg(long, default_value = "")]
    company_code: String,

    /// Contract password
    #[arg(long, default_value = "")]
    password: String,

    /// Service code, comma separated for several services
    #[arg(long, default_value = "04014")]
    service: String,

    #[arg(long, default_value = "70002900")]
    origin: String,

    #[arg(long, default_value = "04547000")]
    destination: String,

    /// Weight in kilograms
    #[arg(long, default_value = "1")]
    weight: String,

    /// 1 box/package, 2 roll/prism, 3 envelope
    #[arg(long, default_value_t = 1)]
    format: i32,

    #[arg(long, default_value_t = 20.0)]
    length: f64,

    #[arg(long, default_value_t = 20.0)]
    height: f64,

    #[arg(long, default_value_t = 20.0)]
    width: f64,

    #[arg(long, default_value_t = 0.0)]
    diameter: f64,

    /// Hand delivery
    #[arg(long)]
    hand_delivery: bool,

    #[arg(long, default_value_t = 0.0)]
    declared_value: f64,

    /// Receipt notice
    #[arg(long)]
    receipt_notice: bool,

    /// Print the decoded quotes as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn quote_request(&self) -> QuoteRequest {
        QuoteRequest {
            company_code: self.company_code.clone(),
            password: self.password.clone(),
            service_code: self.service.clone(),
            origin_cep: self.origin.clone(),
            destination_cep: self.destination.clone(),
            weight: self.weight.clone(),
            format: self.format,
            length: self.length,
            height: self.height,
            width: self.width,
            diameter: self.diameter,
            hand_delivery: QuoteRequest::flag(self.hand_delivery).to_string(),
            declared_value: self.declared_value,
            receipt_notice: QuoteRequest::flag(self.receipt_notice).to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = CorreiosClient::new(ClientConfig {
        base_url: cli.endpoint.clone(),
        timeout_ms: cli.timeout_ms,
    })?;

    let response = client
        .fetch_quote(&cli.quote_request())
        .await
        .context("Quote request failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    for quote in &response.services {
        println!(
            "Código: {} ({})",
            quote.codigo,
            quote.service_name().unwrap_or("serviço desconhecido")
        );
        println!("Valor: {}", quote.valor);
        println!("PrazoEntrega: {}", quote.prazo_entrega);
        println!("ValorSemAdicionais: {}", quote.valor_sem_adicionais);
        println!("ValorMaoPropria: {}", quote.valor_mao_propria);
        println!("ValorAvisoRecebimento: {}", quote.valor_aviso_recebimento);
        println!("ValorValorDeclarado: {}", quote.valor_valor_declarado);
        println!("EntregaDomiciliar: {}", quote.entrega_domiciliar);
        println!("EntregaSabado: {}", quote.entrega_sabado);
        println!("ObsFim: {}", quote.obs_fim);
        if quote.has_error() {
            println!("Erro: {} {}", quote.erro, quote.msg_erro);
        }
        println!();
    }

    Ok(())
}
