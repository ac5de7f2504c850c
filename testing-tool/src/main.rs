use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use serde_json::Value;

/// Muestra de telemetría tal como la envía un rastreador
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sample {
    license_plate: String,
    latitude: f64,
    longitude: f64,
    speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_level: Option<f64>,
}

struct Settings {
    base_url: String,
    api_key: String,
    plate: String,
}

// Recorrido corto por São Paulo: arranque, tramo rápido, parada y llegada
const ROUTE: &[(f64, f64, f64, f64)] = &[
    (-23.5505, -46.6333, 0.0, 0.0),
    (-23.5520, -46.6350, 35.0, 225.0),
    (-23.5545, -46.6380, 62.0, 230.0),
    (-23.5580, -46.6420, 95.0, 228.0),
    (-23.5620, -46.6465, 104.0, 226.0),
    (-23.5650, -46.6500, 48.0, 220.0),
    (-23.5660, -46.6510, 0.0, 220.0),
    (-23.5660, -46.6510, 0.0, 220.0),
    (-23.5675, -46.6530, 30.0, 215.0),
    (-23.5690, -46.6550, 0.0, 215.0),
];

#[tokio::main]
async fn main() -> Result<()> {
    println!("{}", "🛰️ Fleet Tracking Simulator".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    let settings = get_settings()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🚗 Reproducir recorrido de prueba");
        println!("2. 📍 Enviar una muestra manual");
        println!("3. 📋 Listar vehículos");
        println!("4. 🚨 Ver infracciones (últimos 30 días)");
        println!("5. 🚪 Salir");
        let choice = prompt("Selecciona una opción (1-5): ")?;

        let outcome = match choice.as_str() {
            "1" => replay_route(&client, &settings).await,
            "2" => send_manual_sample(&client, &settings).await,
            "3" => show_json(&client, &format!("{}/api/vehicles", settings.base_url)).await,
            "4" => {
                show_json(&client, &format!("{}/api/reports/violations", settings.base_url)).await
            }
            "5" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("{} {:#}", "❌ Error:".bright_red(), e);
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label.bright_yellow());
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn prompt_or(label: &str, default: &str) -> Result<String> {
    let value = prompt(&format!("{} [{}]: ", label, default))?;
    Ok(if value.is_empty() { default.to_string() } else { value })
}

fn get_settings() -> Result<Settings> {
    println!("{}", "⚙️ CONFIGURACIÓN".bright_cyan().bold());
    println!("{}", "=================".bright_cyan());

    let base_url = prompt_or("Servidor", "http://localhost:5000")?;
    let default_key = std::env::var("TRACKING_API_KEY").unwrap_or_default();
    let api_key = prompt_or("Clave API (x-api-key)", &default_key)?;
    let plate = prompt_or("Matrícula", "SIM-0001")?;

    Ok(Settings {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key,
        plate,
    })
}

async fn send_sample(client: &reqwest::Client, settings: &Settings, sample: &Sample) -> Result<()> {
    let response = client
        .post(format!("{}/api/tracking", settings.base_url))
        .header("x-api-key", &settings.api_key)
        .json(sample)
        .send()
        .await
        .context("no se pudo contactar con el servidor")?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        let vehicle = &body["vehicle"];
        println!(
            "{} {} {:>6.1} km/h  {}",
            "✅".green(),
            vehicle["licensePlate"].as_str().unwrap_or("?").bright_white(),
            sample.speed,
            vehicle["status"].as_str().unwrap_or("?").bright_cyan()
        );
    } else {
        println!(
            "{} {} {}",
            "❌".red(),
            status.as_str().bright_red(),
            serde_json::to_string(&body)?
        );
    }
    Ok(())
}

async fn replay_route(client: &reqwest::Client, settings: &Settings) -> Result<()> {
    let delay = prompt_or("Segundos entre muestras", "2")?
        .parse::<u64>()
        .context("número de segundos inválido")?;

    println!();
    println!("{}", "🚗 REPRODUCIENDO RECORRIDO...".bright_cyan().bold());

    for (index, (latitude, longitude, speed, heading)) in ROUTE.iter().enumerate() {
        let sample = Sample {
            license_plate: settings.plate.clone(),
            latitude: *latitude,
            longitude: *longitude,
            speed: *speed,
            heading: Some(*heading),
            ignition: Some(if index + 1 == ROUTE.len() { "off" } else { "on" }.to_string()),
            battery_level: Some(100.0 - index as f64 * 2.0),
        };
        send_sample(client, settings, &sample).await?;
        if index + 1 < ROUTE.len() {
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    }

    println!("{}", "🏁 Recorrido completado".bright_green());
    Ok(())
}

async fn send_manual_sample(client: &reqwest::Client, settings: &Settings) -> Result<()> {
    let latitude = prompt_or("Latitud", "-23.5505")?.parse::<f64>()?;
    let longitude = prompt_or("Longitud", "-46.6333")?.parse::<f64>()?;
    let speed = prompt_or("Velocidad (km/h)", "0")?.parse::<f64>()?;
    let ignition = prompt("Ignición (on/off, vacío para omitir): ")?;

    let sample = Sample {
        license_plate: settings.plate.clone(),
        latitude,
        longitude,
        speed,
        heading: None,
        ignition: (!ignition.is_empty()).then_some(ignition),
        battery_level: None,
    };
    send_sample(client, settings, &sample).await
}

async fn show_json(client: &reqwest::Client, url: &str) -> Result<()> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    println!("{} {}", "📥 Respuesta:".bright_blue(), status);
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
