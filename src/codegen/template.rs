//! Program skeleton around the emitted handlers.
//!
//! Placeholders are `{{token}}`, `{{base_url}}` and `{{handlers}}`. Rendering
//! is a single left-to-right pass, so placeholder-like text inside substituted
//! values is never expanded again.

use super::literal::py_str;

pub const PROGRAM_TEMPLATE: &str = r#"import asyncio
import logging

from aiogram import Bot, Dispatcher, F, types
from aiogram.filters import StateFilter
from aiogram.fsm.context import FSMContext
from aiogram.types import (
    InlineKeyboardButton,
    InlineKeyboardMarkup,
    KeyboardButton,
    ReplyKeyboardMarkup,
)

TOKEN = {{token}}
BASE_URL = {{base_url}}

bot = Bot(token=TOKEN)
dp = Dispatcher()


{{handlers}}


async def main():
    logging.basicConfig(level=logging.INFO)
    await dp.start_polling(bot)


if __name__ == "__main__":
    asyncio.run(main())
"#;

/// Splice the bot credentials and handlers into [`PROGRAM_TEMPLATE`].
pub fn render_program(token: &str, base_url: &str, handlers: &str) -> String {
    render(PROGRAM_TEMPLATE, |name| match name {
        "token" => Some(py_str(token)),
        "base_url" => Some(py_str(base_url)),
        "handlers" => Some(handlers.trim_end().to_string()),
        _ => None,
    })
}

/// Replace `{{name}}` with `lookup(name)`; unknown placeholders stay verbatim.
pub fn render(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
