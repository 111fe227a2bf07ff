#[cfg(target_os = "espidf")]
mod hw;
#[cfg(target_os = "espidf")]
mod runtime;

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(err) = runtime::run() {
        log::error!("doorbell halted: {err}");
    }
    // Startup failures park here instead of rebooting.
    loop {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(1_000);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {}
