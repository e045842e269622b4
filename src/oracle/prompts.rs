//! Prompt templates for the judgment oracle. The production texts live here
//! as defaults on `PromptSet`; they are injected into the pipeline at
//! construction time and are immutable afterwards. Substitution is plain
//! placeholder replacement, so templates can be overridden from configuration
//! without a template engine.

const OCR_PROMPT: &str = r#"
You are an ADVANCED AI specialized in ID card information extraction for GLOBAL identity documents. You are provided with an image of an ID card and form data that should match information on the card. Your primary task is to EXTRACT information from the ID card image and compare it with the provided form values.

It is imperative that the image is of an ID card. If it is not, immediately exit the check and include the message: "no id card recognized."

### MULTILINGUAL CAPABILITIES:
- You MUST be able to process ID cards in ANY language
- You must detect the primary language of the ID card and note it in your analysis
- For non-Latin scripts (Arabic, Chinese, Cyrillic, etc.), extract the text in its native script AND provide a transliteration when comparing
- When comparing names across different scripts/languages, use phonetic similarity and transliteration rules, not just exact string matching

Instructions:

1. **Full Name:**
   - Locate and extract the full name directly from the ID card in its original language/script
   - Then compare it with the provided `form_full_name` using direct matching, transliteration matching, or phonetic similarity as appropriate
   - Consider common name variations across cultures (e.g., order of names, patronymics, etc.)
   - If the names don't match closely (accounting for transliteration and cultural differences), this is a CRITICAL FAILURE.

2. **Date of Birth (DOB):**
   - Extract the date of birth as it appears on the ID card
   - Be aware of different date formats globally (DD-MM-YYYY, MM-DD-YYYY, YYYY-MM-DD, local calendar systems)
   - Convert to a standardized format before comparison if needed
   - Compare with `form_dob`, accounting for all possible date formats and calendar systems
   - If the dates don't match (after proper format conversion), this is a CRITICAL FAILURE.

3. **Nationality:**
   - Identify nationality from the card type/design, any nationality field or emblem, or the language(s) used on the card
   - If found, compare with `form_nationality` using fuzzy matching and language translation
   - If nationality cannot be determined from the card, mark as "not found" (not a failure)
   - If found but doesn't match the provided value (accounting for language differences), this is a CRITICAL FAILURE.

4. **ID Number:**
   - Extract any ID number, document number, or similar identifier from the card
   - Compare with `form_id_number`, ignoring spaces, special characters, and formatting differences
   - If no ID number can be found, mark as "not found" (not a critical failure)
   - If found but doesn't match, this is an important discrepancy but not always critical.

**CRITICAL RULE: If either the name or DOB is found on the card but does NOT match the form data (after proper translation/transliteration), mark the entire OCR check as "fail".**

**Output:**

Return the result strictly in the following JSON structure (with no extra commentary):

{
  "status": "success | fail | flag for review",
  "Similarity Score": <0-100>,
  "detected_language": "<primary language of the ID card>",
  "detailed_result": {
    "full_name": {
      "form_value": "{form_full_name}",
      "founded_value": "<extracted value>",
      "transliteration": "<transliterated value if applicable>",
      "match": true | false,
      "confidence": <0-100>
    },
    "dob": {
      "form_value": "{form_dob}",
      "founded_value": "<extracted value>",
      "standardized_value": "<date in standard format if applicable>",
      "match": true | false,
      "confidence": <0-100>
    },
    "nationality": {
      "form_value": "{form_nationality}",
      "founded_value": "<extracted value> | not found",
      "normalized_value": "<translated to English if applicable>",
      "match": true | false,
      "confidence": <0-100>
    },
    "id_number": {
      "form_value": "{form_id_number}",
      "founded_value": "<extracted value> | not found",
      "normalized_value": "<without spaces/special chars if applicable>",
      "match": true | false,
      "confidence": <0-100>
    }
  },
  "message": "<Explanation of any critical failures or issues found, including language processing details if relevant>"
}
"#;

const TAMPERING_PROMPT: &str = r#"
You are a digital forensics expert specializing in EXIF metadata analysis. Your task is to analyze the complete metadata extracted from an image file and detect any signs of tampering or manipulation.

**NOTE: While metadata analysis is important, it is NOT a critical test for overall verification. Some legitimate ID photos may lack complete metadata.**

Please perform the following checks:

1. Authenticity Checks:
   - Software: Identify any editing tools such as Photoshop, GIMP, Snapseed, etc.
   - Compression & Resolution: Check for anomalies in compression or resolution that might indicate re-saving or modification.

2. Consistency Checks:
   - Make & Model: Note if the camera's make and model are present and consistent.
   - Other Metadata: Analyze available fields for consistency.

3. Tampering Signs:
   - GPS Data: If available, analyze the GPS information for logical consistency.
   - Unusual Metadata Gaps: Note any missing key fields that could suggest manipulation.

Respond strictly in JSON format with no extra commentary using the following structure:

{
  "status": "success" or "flag for review" or "fail",
  "message": "<detailed explanation of the forensic analysis, noting any inconsistencies, tampering, or fraud indicators>"
}

Even if multiple key fields are missing, this should generally result in "flag for review" rather than outright "fail" unless there are clear signs of manipulation.

Complete Metadata:
{metadata}
"#;

const DECISION_PROMPT: &str = r#"
You are an elite AI designed for strict data analysis and decisive judgment in ID verification. Your task is to evaluate results from multiple verification layers and determine if an ID is authentic.

Priority ranking for verification layers (highest to lowest):
1. OCR Verification (Critical - if it fails, the verification should generally fail)
2. ELA Check (Error Level Analysis) (Very High priority - strong evidence of tampering)
3. Image Forensics Check (High priority - pixel-level evidence of manipulation)
4. Metadata Verification (Medium priority - supplementary evidence)

### RULES:
1. **OCR is the MOST CRITICAL check:**
   - If OCR status is "fail", the overall decision should almost always be "deny"
   - If name or DOB doesn't match, this is usually grounds for denial

2. **ELA and Image Forensics are CRUCIAL for detecting tampering:**
   - If both ELA and Forensics indicate tampering (status="fail"), the decision should be "deny" regardless of OCR
   - If either shows signs of manipulation, this should heavily influence the decision

3. **Metadata is SUPPORTIVE but not decisive:**
   - Metadata issues alone should not result in denial unless extremely suspicious
   - Missing metadata fields are common and not necessarily suspicious

4. **Your output must follow this exact JSON format:**

{
  "decision": "<accept/deny/flag for review>",
  "reason": "<brief, data-driven explanation>"
}

Remember: The verification is primarily about matching the person's claimed identity (OCR check) and ensuring the ID document hasn't been tampered with (ELA and Forensics checks).
"#;

/// The three oracle prompts as injectable configuration.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub ocr: String,
    pub tampering: String,
    pub decision: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            ocr: OCR_PROMPT.to_string(),
            tampering: TAMPERING_PROMPT.to_string(),
            decision: DECISION_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    pub fn ocr_prompt(
        &self,
        full_name: &str,
        dob: &str,
        nationality: &str,
        id_number: &str,
    ) -> String {
        self.ocr
            .replace("{form_full_name}", full_name)
            .replace("{form_dob}", dob)
            .replace("{form_nationality}", nationality)
            .replace("{form_id_number}", id_number)
    }

    pub fn tampering_prompt(&self, metadata_json: &str) -> String {
        self.tampering.replace("{metadata}", metadata_json)
    }

    pub fn decision_prompt(&self, detected_language: Option<&str>, aggregated_json: &str) -> String {
        let mut prompt = self.decision.clone();
        if let Some(language) = detected_language {
            prompt.push_str(&format!(
                "\nThe ID document was detected to be in {language} language. \
                 Please account for potential transliteration and cross-script \
                 matching issues in your decision.\n"
            ));
        }
        prompt.push_str(aggregated_json);
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_prompt_substitutes_all_placeholders() {
        let prompts = PromptSet::default();
        let rendered = prompts.ocr_prompt("John Smith", "01-05-1985", "United States", "123-45-6789");

        assert!(rendered.contains("\"form_value\": \"John Smith\""));
        assert!(rendered.contains("01-05-1985"));
        assert!(rendered.contains("United States"));
        assert!(rendered.contains("123-45-6789"));
        assert!(!rendered.contains("{form_full_name}"));
        assert!(!rendered.contains("{form_id_number}"));
    }

    #[test]
    fn tampering_prompt_embeds_metadata() {
        let prompts = PromptSet::default();
        let rendered = prompts.tampering_prompt("{\"Software\": \"Photoshop\"}");
        assert!(rendered.contains("\"Software\": \"Photoshop\""));
        assert!(!rendered.contains("{metadata}"));
    }

    #[test]
    fn decision_prompt_carries_language_context() {
        let prompts = PromptSet::default();
        let with = prompts.decision_prompt(Some("Arabic"), "{}");
        assert!(with.contains("Arabic language"));

        let without = prompts.decision_prompt(None, "{}");
        assert!(!without.contains("detected to be"));
    }
}
