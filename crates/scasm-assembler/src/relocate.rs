//! Relocation: writes label addresses into the laid-out code.
//!
//! Runs strictly after [`finalize`](crate::layout::finalize); it needs a
//! [`Layout`] because only the layout knows physical offsets.

use indexmap::IndexMap;
use scasm_bytecode::{Dialect, MAX_CODE_ADDRESS};

use crate::Error;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::image::{Image, ImageLabel};
use crate::labels::{LabelTable, ReferenceKind, UnresolvedReference};
use crate::layout::Layout;

/// Resolve every label use against `layout` and produce the image.
///
/// Undefined labels and out-of-range relative targets are reported to
/// `diagnostics`; the affected fields are left zeroed. An address too large
/// for a 16-bit field is written wrapped, with a warning. An address above
/// 24 bits or a field outside its instruction is an internal error.
pub fn backpatch(
    mut layout: Layout,
    labels: LabelTable,
    dialect: Dialect,
    diagnostics: &mut Diagnostics,
) -> Result<Image, Error> {
    let label_case = labels.case();
    let (names, table) = labels.into_parts();
    let mut code = std::mem::take(&mut layout.code);

    let mut addresses = IndexMap::with_capacity(table.len());
    let mut patched = 0usize;

    for label in table.into_values() {
        let name = names.resolve(label.symbol);
        let Some(target) = label.target else {
            if let Some(first) = label.uses.first() {
                diagnostics
                    .report(DiagnosticKind::UndefinedLabel, first.span)
                    .message(name)
                    .emit();
            }
            continue;
        };

        let address = layout
            .get(target)
            .ok_or_else(|| Error::Internal(format!("label `{name}` targets an unknown slot")))?
            .offset;
        addresses.insert(
            label_case.fold(name).into_owned(),
            ImageLabel {
                name: name.to_owned(),
                address,
            },
        );

        for reference in &label.uses {
            if write_reference(&mut code, &layout, reference, address, name, diagnostics)? {
                patched += 1;
            }
        }
    }

    log::debug!(
        "relocated {patched} references to {} labels in {} bytes",
        addresses.len(),
        code.len()
    );

    Ok(Image {
        dialect,
        code,
        instructions: layout.finalized,
        labels: addresses,
        label_case,
    })
}

fn write_reference(
    code: &mut [u8],
    layout: &Layout,
    reference: &UnresolvedReference,
    address: u32,
    name: &str,
    diagnostics: &mut Diagnostics,
) -> Result<bool, Error> {
    let owner = layout
        .get(reference.instruction)
        .ok_or_else(|| Error::Internal(format!("use of `{name}` in an unknown slot")))?;
    let width = reference.kind.width();
    if reference.offset + width > owner.len as usize {
        return Err(Error::Internal(format!(
            "use of `{name}` at +{} overruns a {}-byte instruction",
            reference.offset, owner.len
        )));
    }
    let at = owner.offset as usize + reference.offset;

    match reference.kind {
        ReferenceKind::Absolute24 => {
            if address > MAX_CODE_ADDRESS {
                return Err(Error::Internal(format!(
                    "address 0x{address:X} of `{name}` exceeds 24 bits"
                )));
            }
            code[at..at + 3].copy_from_slice(&address.to_le_bytes()[..3]);
        }
        ReferenceKind::Relative16 => {
            let rel = i64::from(address) - (at as i64 + 2);
            let Ok(rel) = i16::try_from(rel) else {
                diagnostics
                    .report(DiagnosticKind::TargetTooFar, reference.span)
                    .message(name)
                    .emit();
                return Ok(false);
            };
            code[at..at + 2].copy_from_slice(&rel.to_le_bytes());
        }
        ReferenceKind::AbsoluteU16 | ReferenceKind::AbsoluteS16 => {
            let signed = reference.kind == ReferenceKind::AbsoluteS16;
            let limit = if signed { i16::MAX as u32 } else { u16::MAX as u32 };
            if address > limit {
                diagnostics.value_truncated(i64::from(address), 16, signed, reference.span);
            }
            code[at..at + 2].copy_from_slice(&(address as u16).to_le_bytes());
        }
    }
    Ok(true)
}
