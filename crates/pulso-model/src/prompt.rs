use pulso_core::{Batch, Sentiment, Urgency, Volume};

pub const SYSTEM_PROMPT: &str = "Eres un analista de ventas experto.
Responde ÚNICAMENTE con un array JSON válido, sin texto adicional, sin markdown, sin bloques de código.";

/// Build the user prompt for one batch of transcripts.
pub fn build_user_prompt(batch: &Batch<'_>) -> String {
    let n = batch.len();
    let transcripts = batch
        .records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("### Cliente {} (id: {})\n{}", i + 1, r.id, r.transcript.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"A continuación hay {n} transcripciones de reuniones de ventas.
Para CADA una, extrae las categorías y devuelve un array JSON con exactamente {n} objetos en el mismo orden.
Cada objeto debe incluir el id del cliente tal como aparece en su encabezado.

Esquema de cada objeto:
{{
  "id": "<id del cliente tal como aparece en el encabezado>",
  "sector": "<industria o rubro>",
  "discoveryChannel": "<cómo se enteró de nosotros: Conferencia, Google, LinkedIn, Recomendación, Webinar, Podcast, Artículo online, Feria, Evento de networking, u otro>",
  "mainPainPoint": "<principal problema que quieren resolver>",
  "interactionVolume": "<{volume}: 'Bajo' si <100/semana, 'Medio' si 100-300/semana, 'Alto' si >300/semana>",
  "integrationNeeds": "<sistemas con los que necesitan integración, o 'Ninguno mencionado'>",
  "urgencyLevel": "<{urgency}>",
  "summary": "<resumen de 1-2 oraciones>",
  "sentiment": "<{sentiment}>",
  "triggerWords": ["<palabras clave de alta intención detectadas, ej. 'presupuesto', 'urgente'>"],
  "nextSteps": "<compromisos concretos acordados, ej. 'Enviar demo el lunes'>"
}}

Usa exactamente los valores indicados para interactionVolume, urgencyLevel y sentiment.

Transcripciones:
{transcripts}

Responde SOLO con el array JSON, sin ningún texto adicional ni bloques de código."#,
        volume = Volume::literals(),
        urgency = Urgency::literals(),
        sentiment = Sentiment::literals(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulso_core::Record;

    #[test]
    fn prompt_lists_every_record_with_its_id() {
        let records = vec![
            Record::new("client-1", "  Hola, somos una clínica.  "),
            Record::new("client-2", "Vendemos seguros."),
        ];
        let batch = Batch {
            index: 0,
            records: &records,
        };
        let prompt = build_user_prompt(&batch);
        assert!(prompt.contains("exactamente 2 objetos"));
        assert!(prompt.contains("### Cliente 1 (id: client-1)\nHola, somos una clínica."));
        assert!(prompt.contains("### Cliente 2 (id: client-2)\nVendemos seguros."));
    }

    #[test]
    fn prompt_spells_out_enum_literals() {
        let records = vec![Record::new("client-1", "x")];
        let prompt = build_user_prompt(&Batch {
            index: 0,
            records: &records,
        });
        assert!(prompt.contains("'Baja' | 'Media' | 'Alta'"));
        assert!(prompt.contains("'Bajo' | 'Medio' | 'Alto'"));
        assert!(prompt.contains("'Positivo' | 'Neutral' | 'Negativo'"));
        assert!(prompt.contains("\"triggerWords\""));
    }
}
