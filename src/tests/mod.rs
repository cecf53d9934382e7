// Test modules for Peerchat
// Each module covers the corresponding source file; `support` holds the
// scripted connector and API fakes shared between them.

mod support;

mod protocol_tests;
mod session_tests;
mod settings_tests;
