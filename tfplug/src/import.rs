//! Import helpers

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{Diagnostic, DynamicValue};

/// Copies the import ID verbatim into `attr_path` of an otherwise empty
/// state. The read that Terraform runs next fills in the rest.
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: crate::types::AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    if request.id.trim().is_empty() {
        response.diagnostics.push(Diagnostic::error(
            "Missing import ID",
            "terraform import requires a non-empty resource ID",
        ));
        return;
    }

    let mut state = DynamicValue::object();
    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                "Failed to set import ID",
                format!("could not set {} to \"{}\": {}", attr_path, request.id, e),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
        identity: request.identity.clone(),
    });
}
