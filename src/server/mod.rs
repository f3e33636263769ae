//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones, una por thread
//! 3. Lee y parsea requests HTTP
//! 4. Enruta y envía la respuesta, después cierra

pub mod tcp;

pub use tcp::Server;
