//! Keyboard markup: the `reply_markup=` expression attached to an action, plus
//! a registration per cell that routes to another node.

use std::collections::HashMap;

use crate::error::CompilerError;
use crate::parse::types::{Markup, MarkupCell, MarkupType, NodeRecord};

use super::literal::py_str;
use super::naming::{button_handler_name, callback_data, callback_handler_name};
use super::writer::CodeWriter;
use super::{EmitContext, Fragment};

/// `primary` is the keyboard expression; `auxiliary` holds one handler per
/// targeted cell, in row-major order.
pub fn emit_markup(
    node: &NodeRecord,
    markup: &Markup,
    ctx: &EmitContext<'_>,
) -> Result<Fragment, CompilerError> {
    let expression = match markup.markup_type {
        MarkupType::Inline => inline_keyboard(node, markup),
        MarkupType::Reply => reply_keyboard(markup),
    };

    let mut auxiliary = Vec::new();
    let mut seen: HashMap<String, (usize, usize)> = HashMap::new();
    for (row, col, cell) in cells(markup) {
        let Some(target) = cell.target else {
            continue;
        };
        let target = ctx.resolve(target, node.id)?;
        let code = match markup.markup_type {
            MarkupType::Inline => {
                let data = callback_data(node.id, &cell.text);
                if let Some((r, c)) = seen.insert(data.clone(), (row, col)) {
                    return Err(CompilerError::emit(
                        "E005",
                        format!(
                            "Buttons ({}, {}) and ({}, {}) share callback data '{}'",
                            r, c, row, col, data
                        ),
                        Some(node.id.0),
                    ));
                }
                callback_registration(node, row, col, &data, &target.handler)
            }
            MarkupType::Reply => button_registration(node, row, col, &cell.text, &target.handler),
        };
        auxiliary.push(code);
    }

    Ok(Fragment {
        primary: expression,
        auxiliary,
    })
}

fn cells(markup: &Markup) -> impl Iterator<Item = (usize, usize, &MarkupCell)> {
    markup.rows.iter().enumerate().flat_map(|(row, cells)| {
        cells
            .iter()
            .enumerate()
            .map(move |(col, cell)| (row, col, cell))
    })
}

fn inline_keyboard(node: &NodeRecord, markup: &Markup) -> String {
    let rows: Vec<String> = markup
        .rows
        .iter()
        .map(|row| {
            let buttons: Vec<String> = row
                .iter()
                .map(|cell| {
                    format!(
                        "InlineKeyboardButton(text={}, callback_data={})",
                        py_str(&cell.text),
                        py_str(&callback_data(node.id, &cell.text))
                    )
                })
                .collect();
            format!("[{}]", buttons.join(", "))
        })
        .collect();
    format!("InlineKeyboardMarkup(inline_keyboard=[{}])", rows.join(", "))
}

fn reply_keyboard(markup: &Markup) -> String {
    let rows: Vec<String> = markup
        .rows
        .iter()
        .map(|row| {
            let buttons: Vec<String> = row
                .iter()
                .map(|cell| format!("KeyboardButton(text={})", py_str(&cell.text)))
                .collect();
            format!("[{}]", buttons.join(", "))
        })
        .collect();
    format!(
        "ReplyKeyboardMarkup(keyboard=[{}], resize_keyboard=True)",
        rows.join(", ")
    )
}

fn callback_registration(
    node: &NodeRecord,
    row: usize,
    col: usize,
    data: &str,
    target: &str,
) -> String {
    let mut w = CodeWriter::new();
    w.line(&format!("@dp.callback_query(F.data == {})", py_str(data)));
    w.block_open(&format!(
        "async def {}(callback: types.CallbackQuery, state: FSMContext)",
        callback_handler_name(node.id, row, col)
    ));
    w.line("await callback.answer()");
    w.line(&format!("await {}(callback.message, state)", target));
    w.block_close();
    w.finish()
}

fn button_registration(
    node: &NodeRecord,
    row: usize,
    col: usize,
    text: &str,
    target: &str,
) -> String {
    let mut w = CodeWriter::new();
    w.line(&format!("@dp.message(F.text == {})", py_str(text)));
    w.block_open(&format!(
        "async def {}(message: types.Message, state: FSMContext)",
        button_handler_name(node.id, row, col)
    ));
    w.line(&format!("await {}(message, state)", target));
    w.block_close();
    w.finish()
}
