//! Feature-selection facade for the audiotag workspace.
//!
//! Depending on `audiotag-workspace` with the default features pulls in the
//! playback controller (`audiotag-core`) together with the desktop transport
//! and decoder (`audiotag-desktop`). Hosts that bring their own capability
//! implementations can disable `desktop` and keep only `controller`.
