//! Workspace root package (virtual; houses dev-dependencies only).
