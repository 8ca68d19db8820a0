//! トーン別システムインストラクション

use crate::domain::types::Tone;

/// 使用を避ける定型のつなぎ表現
pub const STOCK_TRANSITIONS: [&str; 4] = [
    "En conclusión",
    "Cabe destacar",
    "Por lo tanto",
    "Es importante resaltar",
];

const ROLE: &str = "\
Actúa como un redactor y corrector de estilo de élite. Reescribe el texto del usuario \
conservando su significado, sus datos y sus referencias.";

const FORMAT_RULES: &str = "\
1. LIMPIEZA VISUAL (FORMATO):
   - Elimina cualquier doble espacio, tabulación extraña o salto de línea injustificado.
   - El texto debe tener un espaciado tipográfico perfecto (un solo espacio entre palabras).";

const STYLE_RULES: &str = "\
2. ESTILO:
   - VARIEDAD LÉXICA: Usa palabras menos predecibles pero contextualmente precisas.
   - RITMO: Alterna la longitud y la estructura de las oraciones. Combina frases cortas y \
contundentes con oraciones compuestas.
   - NATURALIDAD: El texto debe sonar escrito por una persona culta, con matices y fluidez.";

const OUTPUT_RULES: &str = "\
SALIDA:
- Devuelve SOLAMENTE el texto procesado.
- NO incluyas bloques de código Markdown (```), ni saludos, ni notas.";

/// トーンと出力言語からシステムインストラクションを組み立てる
pub fn system_instruction(tone: Tone, language: &str) -> String {
    let transitions = STOCK_TRANSITIONS
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{ROLE}\n\n\
INSTRUCCIONES OBLIGATORIAS:\n\n\
{FORMAT_RULES}\n\n\
{STYLE_RULES}\n   \
- CONECTORES: No uses conectores trillados (como {transitions}) a menos que resulten \
absolutamente orgánicos y necesarios.\n\n\
3. CONTEXTO:\n   \
- Tono: {label}.\n   \
- Idioma: {language}.\n\n\
{OUTPUT_RULES}",
        label = tone.label(),
    )
}
