// src/services/prompts.rs
//! Static prompt context and response schemas sent with every generation call.

use serde_json::{Value, json};

const VFX_KNOWLEDGE_BASE: &str = r#"
{
  "vfx_transformations": [
    {
      "id": "trans_001",
      "name": "Morphing",
      "type": "Geometric Interpolation",
      "description": "An object or face transitions smoothly into another form.",
      "technical_parameters": {
        "method": ["2D Mesh Warping", "3D Blend Shapes"],
        "key_features": ["Feature Point Tracking", "Cross-Dissolve", "Topology Interpolation"]
      }
    },
    {
      "id": "trans_002",
      "name": "Particle Dispersion",
      "type": "Simulation",
      "description": "The character breaks apart into dust, sand or light particles and scatters.",
      "technical_parameters": {
        "forces": ["Gravity", "Turbulence", "Wind"],
        "particle_attributes": ["Scatter Amount", "Twist", "Birth Rate", "Lifespan"],
        "rendering_type": ["Volumetric", "Sprite-based", "Voxel Disintegration"]
      }
    },
    {
      "id": "trans_003",
      "name": "Fluid Transformation",
      "type": "Physics Simulation",
      "description": "A solid form liquefies and becomes fluid.",
      "technical_parameters": {
        "properties": ["Viscosity", "Surface Tension", "Density"],
        "solver_type": ["FLIP", "SPH (Smoothed-Particle Hydrodynamics)"],
        "meshing_required": true
      }
    },
    {
      "id": "trans_004",
      "name": "Digital Double Swap",
      "type": "Compositing & 3D",
      "description": "The live actor is fully replaced by a digital model.",
      "technical_parameters": {
        "tracking": ["Matchmoving", "Motion Capture"],
        "rendering": ["Photorealistic Shading", "Subsurface Scattering"],
        "cleanup": ["Plate Reconstruction", "Rig Removal"]
      }
    },
    {
      "id": "trans_005",
      "name": "Geometric Instancing",
      "type": "Procedural Generation",
      "description": "The character's surface turns into thousands of small objects (feathers, insects, leaves, crystals).",
      "technical_parameters": {
        "distribution": ["Surface", "Volume"],
        "instance_object": ["Feathers", "Insects", "Leaves", "Crystal Prisms"],
        "animation_control": ["Crowd Simulation", "Procedural Noise"]
      }
    }
  ]
}
"#;

const LENS_KNOWLEDGE_BASE: &str = r#"
{
  "camera_lens_database": {
    "focal_lengths": [
      { "type": "Wide Angle", "range": "16mm - 35mm", "usage": "Dynamic sense of motion, isolating the character." },
      { "type": "Standard / Normal", "range": "35mm - 55mm", "usage": "Natural perspective." },
      { "type": "Portrait / Short Telephoto", "range": "65mm - 85mm", "usage": "Character-driven scenes, bokeh." }
    ]
  }
}
"#;

const CAMERA_KNOWLEDGE_BASE: &str = r#"
{
  "cinema_camera_database": {
    "brands": [
      { "brand": "ARRI", "key_models": ["ALEXA 35", "ALEXA Mini LF"] },
      { "brand": "Sony", "key_models": ["VENICE 2"] },
      { "brand": "Analog Film", "key_models": ["35mm Film", "IMAX"] }
    ]
  }
}
"#;

const SYSTEM_PROMPT_HEADER: &str = r#"
You are a Senior Technical Director (TD) for VFX & AI Art.
Your objective is to analyze the input image and generate highly technical, industry-standard prompts specifically optimized for the "Nano Banana Pro" (Gemini 3 Pro Image) model.

**System Profile:**
- Role: VFX Technical Director & Prompt Engineer
- Specialization: Blending Reality with Abstraction (Surrealism, Glitch Art, Simulation).
- Core Directive: Deconstruct images using the provided VFX Technical Report. Identify specifically IF the subject is undergoing Morphing, Particle Dispersion, Fluid Sim, or Geometric Instancing.
"#;

const SYSTEM_PROMPT_FRAMEWORK: &str = r#"
**Deep Analysis Framework:**
1. Narrative & Subject: Identify the main subject (Age, Ethnicity, Clothing).
2. **Deep Facial Forensics**: Hair length/style, eye details, skin texture.
3. **Advanced VFX Forensics (CRITICAL PRIORITY)**:
   - **Classify the Effect**: You MUST map the effect to one of the categories in the VFX Knowledge Base (e.g., "Geometric Instancing", "Particle Dispersion").
   - **Identify the Technique**: Use technical terms (e.g., "Voxel Disintegration", "SPH Fluid Solver", "3D Blend Shapes").
   - **Interaction Verb**: How is the subject transforming? (e.g., "The shoulder is extruding into glass prisms", "The face is dissolving into sand").
   - **The Blend**: Describe the gradient where the *Real* object becomes the *Abstract* simulation.
4. Color Science & Grading: Palette (Teal & Orange, etc.) and Film Stock.
5. Lighting: Key light direction, volumetric fog.
6. Materiality: PBR textures (Albedo, Roughness).

**Output Generation Rules:**
- **Nano Banana Pro Prompt**:
  **ZERO SUMMARY POLICY:** Do not summarize, do not shorten, and do not exclude details.
  Every single adjective and technical detail identified in the analysis (VFX, Face, Light, Camera, Material) MUST be present in the final prompt text.

  **HIERARCHY & FORMULA (Strictly Follow This Sequence):**
  1. **[Subject & Action]**: Full detailed description of the character and pose.
  2. **[VFX Physics Core]**: "[Subject] IS VISIBLY UNDERGOING [VFX CLASS] via [VFX TECHNIQUE]...". Use the [Interaction Verb]. Describe the [VFX Details] fully.
  3. **[Facial Forensics]**: Insert ALL facial details found (Hair style/color, Eye color/shape, Skin texture/imperfections).
  4. **[Materiality & Texture]**: Describe the PBR properties (Roughness, Subsurface Scattering, Fabric weave).
  5. **[Environment & Lighting]**: Full description of the setting, atmosphere, and light setup.
  6. **[Cinematography & Color]**: Camera Brand, Lens Focal Length, Color Grading, and Film Stock.
  7. **[Negative Constraints]**: Append "Avoid: [Constraint 1], [Constraint 2]...".

  **CRITICAL:**
  - The prompt should be dense and exhaustive.
  - **Force the Interaction**: The subject IS the effect. "The jacket is physically morphing into fluid."
  - **Do NOT** just list tags. Write a cohesive, technical paragraph.

- **JSON Payload Structure**:
  Provide a clean, valid JSON object containing the `prompt_text`, `negative_prompt`, and specific technical metadata (`aspect_ratio`, `vfx_type`) derived from the analysis.
"#;

pub const ANALYZE_INSTRUCTION: &str = "Analyze this image. Classify the VFX Transformation (Morphing, Instancing, Particles, Fluid) and how it blends reality with abstraction. Provide the prompt text AND a structured JSON payload of that prompt.";

pub const REGENERATION_SYSTEM_PROMPT: &str = "You are a Senior VFX Prompt Engineer. Convert structured analysis into high-end technical prompts. Do not shorten the output.";

pub const ANALYSIS_FIELDS: [&str; 16] = [
    "subject",
    "facial_features",
    "action",
    "vfx_class",
    "vfx_technique",
    "vfx_interaction_verb",
    "vfx_details",
    "environment",
    "lighting",
    "color_grading",
    "materiality",
    "camera_lens",
    "camera_type",
    "camera_angle",
    "style_tags",
    "detected_text",
];

/// Technical director persona with the three knowledge bases inlined.
pub fn system_prompt() -> String {
    format!(
        "{header}\n**VFX Technical Knowledge Base (Strict Adherence Required)**\n{vfx}\n**Camera & Lens Knowledge Base**\n{lens}{camera}{framework}",
        header = SYSTEM_PROMPT_HEADER,
        vfx = VFX_KNOWLEDGE_BASE,
        lens = LENS_KNOWLEDGE_BASE,
        camera = CAMERA_KNOWLEDGE_BASE,
        framework = SYSTEM_PROMPT_FRAMEWORK,
    )
}

/// Text-only instruction for rebuilding prompts from an (edited) analysis.
pub fn regeneration_instruction(analysis_json: &str) -> String {
    format!(
        r#"Based strictly on the following visual analysis data, regenerate the text-to-image prompts.

Analysis Data:
{analysis_json}

Ensure the "nano_banana_pro_prompt" strictly follows the Technical Director Formula.
**CRITICAL**: DO NOT SUMMARIZE. Include EVERY detail from the analysis in the prompt.
Also generate the "nano_banana_pro_struct" with the same data in strict JSON format."#
    )
}

fn described_string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn analysis_schema() -> Value {
    let mut properties = serde_json::Map::new();
    for field in ANALYSIS_FIELDS {
        let schema = match field {
            "style_tags" => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
            "vfx_class" => described_string(
                "The Broad Category from the VFX Report (e.g., Geometric Instancing, Fluid Transformation).",
            ),
            "vfx_technique" => described_string(
                "The specific technical method (e.g., Voxel Disintegration, 2D Mesh Warping, SPH Solver).",
            ),
            "vfx_interaction_verb" => {
                described_string("Active verb (Shattering, Melting, Extruding).")
            }
            "vfx_details" => {
                described_string("Detailed visual description of the deformation physics.")
            }
            _ => json!({ "type": "STRING" }),
        };
        properties.insert(field.to_string(), schema);
    }

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": ANALYSIS_FIELDS,
    })
}

/// Schema for the `generated_prompts` object; also used alone for regeneration.
pub fn generated_prompts_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "nano_banana_pro_prompt": { "type": "STRING" },
            "nano_banana_pro_struct": {
                "type": "OBJECT",
                "properties": {
                    "prompt_text": { "type": "STRING" },
                    "negative_prompt": { "type": "STRING" },
                    "recommended_model": { "type": "STRING" },
                    "aspect_ratio": { "type": "STRING" },
                    "vfx_metadata": described_string("Technical summary of the VFX.")
                },
                "required": ["prompt_text", "negative_prompt", "recommended_model", "aspect_ratio"]
            },
            "negative_prompt": { "type": "STRING" }
        },
        "required": ["nano_banana_pro_prompt", "nano_banana_pro_struct", "negative_prompt"]
    })
}

pub fn analysis_result_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": analysis_schema(),
            "generated_prompts": generated_prompts_schema()
        },
        "required": ["analysis", "generated_prompts"]
    })
}
